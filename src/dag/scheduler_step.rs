// src/dag/scheduler_step.rs

use crate::dag::task_info::ScheduledTask;
use crate::engine::TaskName;

/// Structured result of a single scheduler "step".
///
/// Tests use this to step the DAG by hand and assert on what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready to run as a result of this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Tasks newly marked as failed in this step (the failing task first,
    /// then any dependents blocked by it).
    pub newly_failed: Vec<TaskName>,
    /// Whether this step finished the current run.
    pub run_just_finished: bool,
}
