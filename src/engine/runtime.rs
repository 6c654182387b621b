// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::engine::TaskName;
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::server::LiveReload;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Summary of one [`Runtime::run`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Tasks that failed during this call, in failure order.
    pub failed: Vec<TaskName>,
    /// Whether the loop stopped because of a shutdown request or a closed
    /// event channel rather than going idle.
    pub shutdown: bool,
}

/// Drives the DAG scheduler in response to `RuntimeEvent`s and delegates
/// task execution to an `ExecutorBackend`.
///
/// This is the IO shell around `CoreRuntime`: it reads events, dispatches
/// tasks and forwards reload signals to the preview server. `run` may be
/// called more than once; the scheduler keeps its history between calls.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    live_reload: Option<LiveReload>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("live_reload", &self.live_reload.is_some())
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            live_reload: None,
        }
    }

    pub fn core(&self) -> &CoreRuntime {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut CoreRuntime {
        &mut self.core
    }

    /// Forward `CoreCommand::Reload` to connected browsers.
    pub fn attach_live_reload(&mut self, live_reload: LiveReload) {
        self.live_reload = Some(live_reload);
    }

    /// Main event loop.
    ///
    /// Returns when the core asks to stop (idle in one-shot mode, or a
    /// shutdown request) or when every event sender is gone.
    pub async fn run(&mut self) -> Result<RunReport> {
        info!(
            exit_when_idle = self.core.options().exit_when_idle,
            "assetpipe runtime started"
        );
        let mut shutdown = false;

        loop {
            let Some(event) = self.event_rx.recv().await else {
                info!("runtime event channel closed; exiting");
                shutdown = true;
                break;
            };

            debug!(?event, "runtime received event");
            let is_shutdown = matches!(event, RuntimeEvent::ShutdownRequested);

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                shutdown = is_shutdown;
                info!(shutdown, "core requested exit; stopping runtime");
                break;
            }
        }

        Ok(RunReport {
            failed: self.core.take_failed(),
            shutdown,
        })
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await?,
            CoreCommand::Reload {
                task,
                kind,
                written,
            } => match &self.live_reload {
                Some(live_reload) => {
                    let receivers = live_reload.notify(kind, &written);
                    debug!(task = %task, ?kind, receivers, "sent reload signal");
                }
                None => debug!(task = %task, "no preview server attached; reload skipped"),
            },
            CoreCommand::RequestExit => debug!("core issued RequestExit"),
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, run_id = tasks[0].run_id, "dispatching ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
