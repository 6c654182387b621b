// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! The core consumes [`RuntimeEvent`]s and produces [`CoreCommand`]s for the
//! async shell (`engine::runtime::Runtime`) to execute. It has no channels,
//! no Tokio types and performs no IO, so it can be unit tested directly.

use std::collections::HashMap;

use tracing::debug;

use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    CoreCommand, CoreStep, handle_task_completion, handle_task_trigger,
};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskName, TaskOutcome};
use crate::types::ReloadKind;

#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
    /// Reload signal to emit after a successful completion, per task.
    reload_policy: HashMap<TaskName, ReloadKind>,
    /// Tasks that failed since the last `take_failed`.
    failed: Vec<TaskName>,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler, options: RuntimeOptions) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(),
            options,
            reload_policy: HashMap::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn options(&self) -> RuntimeOptions {
        self.options
    }

    pub fn set_options(&mut self, options: RuntimeOptions) {
        self.options = options;
    }

    /// Install the reload signal emitted when each task completes.
    pub fn set_reload_policy(&mut self, policy: impl IntoIterator<Item = (TaskName, ReloadKind)>) {
        self.reload_policy = policy.into_iter().collect();
    }

    /// Return and clear the tasks that failed so far.
    pub fn take_failed(&mut self) -> Vec<TaskName> {
        std::mem::take(&mut self.failed)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => {
                handle_task_trigger(&mut self.scheduler, &mut self.queue, task, reason)
            }
            RuntimeEvent::TaskCompleted {
                task,
                outcome,
                written,
            } => {
                let reload = self.reload_command(&task, outcome, written);
                let mut step = handle_task_completion(
                    &mut self.scheduler,
                    &mut self.queue,
                    &self.options,
                    &mut self.failed,
                    task,
                    outcome,
                );
                if let Some(reload) = reload {
                    step.commands.insert(0, reload);
                }
                step
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    fn reload_command(
        &self,
        task: &str,
        outcome: TaskOutcome,
        written: Vec<String>,
    ) -> Option<CoreCommand> {
        if outcome != TaskOutcome::Success {
            return None;
        }
        let kind = self.reload_policy.get(task).copied()?;
        if kind == ReloadKind::None {
            return None;
        }

        debug!(task = %task, ?kind, files = written.len(), "queueing reload signal");
        Some(CoreCommand::Reload {
            task: task.to_string(),
            kind,
            written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{DagGraph, ScheduledTask};
    use crate::engine::TriggerReason;

    fn core(exit_when_idle: bool) -> CoreRuntime {
        let graph =
            DagGraph::from_edges(&["clean", "css", "html"], &[("clean", "css"), ("clean", "html")])
                .unwrap();
        CoreRuntime::new(Scheduler::new(graph), RuntimeOptions { exit_when_idle })
    }

    fn trigger(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskTriggered {
            task: task.to_string(),
            reason: TriggerReason::Manual,
        }
    }

    fn done(task: &str, outcome: TaskOutcome) -> RuntimeEvent {
        RuntimeEvent::TaskCompleted {
            task: task.to_string(),
            outcome,
            written: vec![format!("{task}/out")],
        }
    }

    fn dispatched(step: &CoreStep) -> Vec<String> {
        step.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => Some(tasks.clone()),
                _ => None,
            })
            .flatten()
            .map(|t: ScheduledTask| t.name)
            .collect()
    }

    #[test]
    fn one_shot_run_exits_when_idle() {
        let mut core = core(true);
        assert_eq!(dispatched(&core.step(trigger("clean"))), vec!["clean"]);
        assert_eq!(
            dispatched(&core.step(done("clean", TaskOutcome::Success))),
            vec!["css", "html"]
        );
        assert!(core.step(done("css", TaskOutcome::Success)).keep_running);

        let last = core.step(done("html", TaskOutcome::Success));
        assert!(!last.keep_running);
        assert!(last.commands.contains(&CoreCommand::RequestExit));
        assert!(core.take_failed().is_empty());
    }

    #[test]
    fn failures_are_collected_with_blocked_dependents() {
        let mut core = core(true);
        core.step(trigger("clean"));
        let step = core.step(done("clean", TaskOutcome::Failed));
        assert!(!step.keep_running);

        let mut failed = core.take_failed();
        failed.sort();
        assert_eq!(failed, vec!["clean", "css", "html"]);
    }

    #[test]
    fn reload_is_emitted_only_for_successful_bound_tasks() {
        let mut core = core(false);
        core.set_reload_policy([
            ("css".to_string(), ReloadKind::InjectStyles),
            ("html".to_string(), ReloadKind::FullReload),
        ]);
        core.step(trigger("clean"));
        let step = core.step(done("clean", TaskOutcome::Success));
        assert!(!step.commands.iter().any(|c| matches!(c, CoreCommand::Reload { .. })));

        let step = core.step(done("css", TaskOutcome::Success));
        assert_eq!(
            step.commands[0],
            CoreCommand::Reload {
                task: "css".to_string(),
                kind: ReloadKind::InjectStyles,
                written: vec!["css/out".to_string()],
            }
        );

        let step = core.step(done("html", TaskOutcome::Failed));
        assert!(!step.commands.iter().any(|c| matches!(c, CoreCommand::Reload { .. })));
        assert!(step.keep_running);
    }

    #[test]
    fn retrigger_during_run_is_queued_for_next_run() {
        let mut core = core(false);
        core.step(trigger("clean"));
        core.step(done("clean", TaskOutcome::Success));

        // css is running; a save queues it behind the current run.
        assert!(dispatched(&core.step(trigger("css"))).is_empty());
        assert!(!core.queue_is_empty());

        core.step(done("css", TaskOutcome::Success));
        let step = core.step(done("html", TaskOutcome::Success));
        assert_eq!(dispatched(&step), vec!["css"]);
        assert!(core.queue_is_empty());
    }

    #[test]
    fn saves_of_different_tasks_during_a_run_are_all_rebuilt() {
        let mut core = core(false);
        core.step(trigger("clean"));
        core.step(done("clean", TaskOutcome::Success));

        // Both css and html are running; neither later save may be lost.
        assert!(dispatched(&core.step(trigger("css"))).is_empty());
        assert!(dispatched(&core.step(trigger("html"))).is_empty());

        core.step(done("css", TaskOutcome::Success));
        let step = core.step(done("html", TaskOutcome::Success));
        let mut next = dispatched(&step);
        next.sort();
        assert_eq!(next, vec!["css", "html"]);
        assert!(core.queue_is_empty());
    }
}
