// src/watch/path_utils.rs

use std::path::Path;

use crate::fs::FileSystem;

/// `path` relative to `root` with `/` separators.
///
/// Falls back to comparing canonical paths, since notify may report a
/// different absolute spelling of the same directory (macOS `/private/var`).
/// Deleted files cannot be canonicalised; their parent directory is used.
pub fn relative_str(fs: &dyn FileSystem, root: &Path, path: &Path) -> Option<String> {
    let to_string = |rel: &Path| rel.to_string_lossy().replace('\\', "/");

    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_string(rel));
    }

    let root_canon = fs.canonicalize(root).ok()?;
    if let Ok(path_canon) = fs.canonicalize(path) {
        return path_canon.strip_prefix(&root_canon).ok().map(to_string);
    }

    let parent = fs.canonicalize(path.parent()?).ok()?;
    let rel_parent = parent.strip_prefix(&root_canon).ok()?;
    Some(to_string(&rel_parent.join(path.file_name()?)))
}
