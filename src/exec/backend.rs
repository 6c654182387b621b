// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of running tasks
//! itself, so tests can swap in a fake that records dispatched tasks and
//! emits `TaskCompleted` events directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::exec::task_runner::run_task;
use crate::tasks::TaskRegistry;

pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    ///
    /// Implementations must eventually send one `RuntimeEvent::TaskCompleted`
    /// per task.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: every scheduled task runs in its own Tokio task.
///
/// The scheduler never dispatches a task name that is still running, so no
/// per-name bookkeeping is needed here.
#[derive(Debug, Clone)]
pub struct RealExecutorBackend {
    registry: Arc<TaskRegistry>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl RealExecutorBackend {
    pub fn new(registry: Arc<TaskRegistry>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            registry,
            runtime_tx,
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let registry = Arc::clone(&self.registry);
        let runtime_tx = self.runtime_tx.clone();

        Box::pin(async move {
            for task in tasks {
                tokio::spawn(run_task(task, Arc::clone(&registry), runtime_tx.clone()));
            }
            Ok(())
        })
    }
}
