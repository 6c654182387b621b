// src/errors.rs

//! Crate-wide error type.
//!
//! Task implementations work with `anyhow` internally and attach file
//! context; everything that crosses a module boundary is folded into
//! [`AssetpipeError`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetpipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("tasks '{first}' and '{second}' may run concurrently but both write {}", .path.display())]
    OutputConflict {
        first: String,
        second: String,
        path: PathBuf,
    },

    #[error("{} task(s) failed: {}", .0.len(), .0.join(", "))]
    TasksFailed(Vec<String>),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetpipeError>;
