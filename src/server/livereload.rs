// src/server/livereload.rs

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::types::ReloadKind;

const CHANNEL_CAPACITY: usize = 16;

/// A signal delivered to every connected browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReloadSignal {
    Reload,
    /// Re-fetch these stylesheets (output-relative paths) without reloading.
    InjectStyles(Vec<String>),
    /// Re-execute these scripts (output-relative paths) without reloading.
    InjectScripts(Vec<String>),
}

impl ReloadSignal {
    /// SSE event name understood by the client script.
    pub fn event_name(&self) -> &'static str {
        match self {
            ReloadSignal::Reload => "reload",
            ReloadSignal::InjectStyles(_) => "css",
            ReloadSignal::InjectScripts(_) => "js",
        }
    }

    pub fn paths(&self) -> &[String] {
        match self {
            ReloadSignal::Reload => &[],
            ReloadSignal::InjectStyles(paths) | ReloadSignal::InjectScripts(paths) => paths,
        }
    }
}

/// Cloneable broadcast handle shared by the runtime and the preview server.
///
/// Sending never blocks. A signal sent while no browser is connected is
/// dropped.
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<ReloadSignal>,
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadSignal> {
        self.tx.subscribe()
    }

    /// Number of connected receivers that got the signal.
    pub fn send(&self, signal: ReloadSignal) -> usize {
        self.tx.send(signal).unwrap_or(0)
    }

    /// Translate a task's reload kind and the files it wrote into a signal.
    ///
    /// Injection only covers files of the matching type; when a task wrote
    /// none of them the browser gets a full reload instead.
    pub fn notify(&self, kind: ReloadKind, written: &[String]) -> usize {
        let signal = match kind {
            ReloadKind::None => return 0,
            ReloadKind::FullReload => ReloadSignal::Reload,
            ReloadKind::InjectStyles => inject_or_reload(written, ".css", ReloadSignal::InjectStyles),
            ReloadKind::InjectScripts => inject_or_reload(written, ".js", ReloadSignal::InjectScripts),
        };
        debug!(event = signal.event_name(), paths = ?signal.paths(), "live reload");
        self.send(signal)
    }
}

fn inject_or_reload(
    written: &[String],
    extension: &str,
    make: fn(Vec<String>) -> ReloadSignal,
) -> ReloadSignal {
    let paths: Vec<String> = written
        .iter()
        .filter(|p| p.ends_with(extension))
        .cloned()
        .collect();
    if paths.is_empty() {
        ReloadSignal::Reload
    } else {
        make(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn styles_are_injected_without_maps() {
        let live = LiveReload::new();
        let mut rx = live.subscribe();

        let sent = live.notify(
            ReloadKind::InjectStyles,
            &written(&["css/main.css", "css/main.css.map"]),
        );
        assert_eq!(sent, 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            ReloadSignal::InjectStyles(written(&["css/main.css"]))
        );
    }

    #[test]
    fn injection_without_matching_files_falls_back_to_reload() {
        let live = LiveReload::new();
        let mut rx = live.subscribe();

        live.notify(ReloadKind::InjectScripts, &[]);
        assert_eq!(rx.try_recv().unwrap(), ReloadSignal::Reload);
    }

    #[test]
    fn none_sends_nothing() {
        let live = LiveReload::new();
        let mut rx = live.subscribe();

        assert_eq!(live.notify(ReloadKind::None, &written(&["index.html"])), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn sending_without_browsers_is_not_an_error() {
        let live = LiveReload::new();
        assert_eq!(live.notify(ReloadKind::FullReload, &[]), 0);
    }
}
