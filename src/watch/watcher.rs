// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::fs::FileSystem;
use crate::watch::event_handler::{WatchState, binding_hash, process_file_change};
use crate::watch::patterns::WatchBinding;

/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` (the source root) recursively and send
/// `RuntimeEvent::TaskTriggered` for every binding a change matches.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    bindings: Vec<WatchBinding>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    fs: Arc<dyn FileSystem>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = fs.canonicalize(&root).unwrap_or(root);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // Receiver gone means the loop has already stopped.
                let _ = event_tx.send(event);
            }
            Err(err) => eprintln!("assetpipe: file watch error: {err}"),
        },
        Config::default(),
    )?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {root:?}"))?;
    info!(root = ?root, bindings = bindings.len(), "file watcher started");

    let state = WatchState::new(fs, root, bindings);

    tokio::spawn(async move {
        seed_hashes(&state).await;

        while let Some(event) = event_rx.recv().await {
            if event.kind.is_access() {
                continue;
            }
            debug!(?event, "received notify event");

            for path in event.paths.iter() {
                if !process_file_change(&state, path, &runtime_tx).await {
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Record the current content of every hashed binding, so the first save
/// that changes nothing does not trigger a rebuild.
async fn seed_hashes(state: &WatchState) {
    let state = state.clone();
    let seeded = tokio::task::spawn_blocking(move || {
        for binding in state.bindings.iter().filter(|b| b.use_hash()) {
            match binding_hash(&state, binding) {
                Ok(hash) => {
                    if let Ok(mut store) = state.hash_store.lock() {
                        store.save(binding.task(), &hash);
                    }
                }
                Err(err) => warn!(
                    task = %binding.task(),
                    error = %format!("{err:#}"),
                    "failed to seed binding hash"
                ),
            }
        }
    })
    .await;

    if seeded.is_err() {
        warn!("hash seeding panicked; first change of every binding will trigger");
    }
}
