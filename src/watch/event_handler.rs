// src/watch/event_handler.rs

//! Turning one changed path into task triggers.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::fs::FileSystem;
use crate::watch::cache::FileCache;
use crate::watch::hash::{HashStore, MemoryHashStore, compute_aggregate_hash};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{WatchBinding, collect_matching_files};

/// Shared state of the watcher loop.
#[derive(Clone)]
pub struct WatchState {
    pub fs: Arc<dyn FileSystem>,
    pub root: PathBuf,
    pub bindings: Arc<Vec<WatchBinding>>,
    pub hash_store: Arc<Mutex<Box<dyn HashStore>>>,
    pub file_cache: Arc<Mutex<FileCache>>,
}

impl WatchState {
    /// Fresh state with an in-memory hash store and an empty file cache.
    pub fn new(fs: Arc<dyn FileSystem>, root: PathBuf, bindings: Vec<WatchBinding>) -> Self {
        let hash_store: Box<dyn HashStore> = Box::new(MemoryHashStore::new());
        Self {
            fs,
            root,
            bindings: Arc::new(bindings),
            hash_store: Arc::new(Mutex::new(hash_store)),
            file_cache: Arc::new(Mutex::new(FileCache::new())),
        }
    }
}

/// Process a single changed path:
/// 1. find the bindings whose globs match it
/// 2. drop bindings whose content hash did not change (when enabled)
/// 3. send a `TaskTriggered` per remaining binding
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_file_change(
    state: &WatchState,
    path: &Path,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    let Some(rel) = relative_str(state.fs.as_ref(), &state.root, path) else {
        debug!(?path, root = ?state.root, "event outside the source root; ignoring");
        return true;
    };

    let matching: Vec<WatchBinding> = state
        .bindings
        .iter()
        .filter(|b| b.matches(&rel))
        .cloned()
        .collect();
    if matching.is_empty() {
        return true;
    }

    if let Ok(mut cache) = state.file_cache.lock() {
        cache.invalidate(path);
    }

    for binding in matching {
        if !should_trigger(state, &binding, &rel).await {
            continue;
        }

        info!(task = %binding.task(), path = %rel, "source changed");
        let event = RuntimeEvent::TaskTriggered {
            task: binding.task().to_string(),
            reason: TriggerReason::FileWatch,
        };
        if runtime_tx.send(event).await.is_err() {
            warn!("runtime channel closed; stopping watcher loop");
            return false;
        }
    }
    true
}

/// Hash check for one binding, run on the blocking pool.
async fn should_trigger(state: &WatchState, binding: &WatchBinding, rel: &str) -> bool {
    if !binding.use_hash() {
        return true;
    }

    let state = state.clone();
    let binding = binding.clone();
    let rel = rel.to_string();

    tokio::task::spawn_blocking(move || match binding_hash(&state, &binding) {
        Ok(new_hash) => {
            let Ok(mut store) = state.hash_store.lock() else {
                warn!(task = %binding.task(), "hash store lock poisoned; triggering anyway");
                return true;
            };
            if store.load(binding.task()).as_deref() == Some(new_hash.as_str()) {
                debug!(task = %binding.task(), path = %rel, "content unchanged; skipping");
                return false;
            }
            store.save(binding.task(), &new_hash);
            true
        }
        Err(err) => {
            warn!(
                task = %binding.task(),
                error = %format!("{err:#}"),
                "failed to hash watched files; triggering anyway"
            );
            true
        }
    })
    .await
    .unwrap_or(true)
}

/// Aggregate hash over every file currently matched by `binding`.
pub fn binding_hash(state: &WatchState, binding: &WatchBinding) -> anyhow::Result<String> {
    let files = collect_matching_files(state.fs.as_ref(), &state.root, binding)?;

    let mut cache = state
        .file_cache
        .lock()
        .map_err(|_| anyhow::anyhow!("file cache lock poisoned"))?;

    let mut entries = Vec::with_capacity(files.len());
    for file in files {
        let hash = cache.get_or_compute(state.fs.as_ref(), &file)?;
        let rel = file
            .strip_prefix(&state.root)
            .unwrap_or(&file)
            .to_string_lossy()
            .replace('\\', "/");
        entries.push((rel, hash));
    }
    Ok(compute_aggregate_hash(&entries))
}
