// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling the watch bindings (source globs -> task + reload signal).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Optional content hashing so unchanged saves do not rebuild.
//!
//! It does not know about the DAG; it only turns filesystem changes into
//! task-level triggers.

pub mod cache;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use patterns::{WatchBinding, build_globset, default_bindings, reload_policy};
pub use watcher::{WatcherHandle, spawn_watcher};
