// src/watch/hash.rs

//! Content hashing for watch bindings.
//!
//! Editors often emit several write events for one save, and some touch
//! files without changing them. With `[watch] use_hash = true` a binding only
//! fires when the aggregate hash of all its files actually changes.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Hash a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Combine per-file hashes (sorted by path) into one.
///
/// Paths are mixed in as well, so renaming a file changes the result.
pub fn compute_aggregate_hash(entries: &[(String, String)]) -> String {
    let mut hasher = Hasher::new();
    for (path, hash) in entries {
        hasher.update(path.as_bytes());
        hasher.update(&[0]);
        hasher.update(hash.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Storage for the last seen aggregate hash per binding.
pub trait HashStore: Send + Sync {
    fn load(&self, task: &str) -> Option<String>;
    fn save(&mut self, task: &str, hash: &str);
}

/// Hashes live for the lifetime of the watcher only.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<String, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, task: &str) -> Option<String> {
        self.map.get(task).cloned()
    }

    fn save(&mut self, task: &str, hash: &str) {
        debug!(task = %task, hash = %hash, "stored binding hash");
        self.map.insert(task.to_string(), hash.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn aggregate_hash_depends_on_names_and_contents() {
        let a = compute_aggregate_hash(&[("a.scss".into(), "h1".into())]);
        let b = compute_aggregate_hash(&[("b.scss".into(), "h1".into())]);
        let c = compute_aggregate_hash(&[("a.scss".into(), "h2".into())]);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, compute_aggregate_hash(&[("a.scss".into(), "h1".into())]));
    }

    #[test]
    fn file_hash_reads_through_the_file_system() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/a.txt", "same");
        fs.add_file("/p/b.txt", "same");
        fs.add_file("/p/c.txt", "different");

        let a = compute_file_hash(&fs, Path::new("/p/a.txt")).unwrap();
        assert_eq!(a, compute_file_hash(&fs, Path::new("/p/b.txt")).unwrap());
        assert_ne!(a, compute_file_hash(&fs, Path::new("/p/c.txt")).unwrap());
    }
}
