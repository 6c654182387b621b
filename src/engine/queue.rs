// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use crate::engine::TaskName;

/// Triggers that arrive while a DAG run is already executing.
///
/// Every trigger is kept until the runtime goes idle; repeated saves of the
/// same task coalesce into one entry. `drain_pending()` hands the whole set
/// to the next run, so no queued change is ever dropped.
#[derive(Debug, Default)]
pub struct TriggerQueue {
    pending: BTreeSet<TaskName>,
}

impl TriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Record that a task was triggered while a DAG run is in progress.
    pub fn record_trigger(&mut self, task: &str) {
        let inserted = self.pending.insert(task.to_string());
        debug!(task = %task, inserted, queued = self.pending.len(), "queued trigger behind running run");
    }

    /// Drain every queued trigger into one sorted list of task names.
    pub fn drain_pending(&mut self) -> Vec<TaskName> {
        let drained: Vec<TaskName> = std::mem::take(&mut self.pending).into_iter().collect();
        debug!(drained = drained.len(), "drained queued triggers into new run");
        drained
    }
}
