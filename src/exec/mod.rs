// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] provides the `ExecutorBackend` trait the runtime dispatches
//!   to, and `RealExecutorBackend`, which runs registered asset tasks.
//! - [`task_runner`] runs one scheduled task on the blocking pool and reports
//!   `TaskCompleted` back to the runtime.

pub mod backend;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
