// src/exec/task_runner.rs

//! Individual task runner.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::tasks::{TaskRegistry, human_size};

/// Run a single task on the blocking pool and report its completion.
///
/// Exactly one `TaskCompleted` event is sent, whatever happens inside the
/// task (error, panic or unknown name).
pub async fn run_task(
    task: ScheduledTask,
    registry: Arc<TaskRegistry>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let (outcome, written) = execute(&task, &registry).await;

    let event = RuntimeEvent::TaskCompleted {
        task: task.name.clone(),
        outcome,
        written,
    };
    if runtime_tx.send(event).await.is_err() {
        error!(
            task = %task.name,
            run_id = task.run_id,
            "runtime is gone; dropping TaskCompleted event"
        );
    }
}

async fn execute(task: &ScheduledTask, registry: &Arc<TaskRegistry>) -> (TaskOutcome, Vec<String>) {
    let Some(asset_task) = registry.get(&task.name) else {
        error!(task = %task.name, run_id = task.run_id, "no task registered under this name");
        return (TaskOutcome::Failed, Vec::new());
    };

    let ctx = registry.context().clone();
    let started = Instant::now();
    let joined = tokio::task::spawn_blocking(move || asset_task.run(&ctx)).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match joined {
        Ok(Ok(report)) => {
            info!(
                task = %task.name,
                run_id = task.run_id,
                files = report.written.len(),
                size = %human_size(report.bytes),
                elapsed_ms,
                "task finished"
            );
            let written = report
                .written
                .iter()
                .filter_map(|path| relative_url(path, &registry.context().dist_root))
                .collect();
            (TaskOutcome::Success, written)
        }
        Ok(Err(err)) => {
            error!(
                task = %task.name,
                run_id = task.run_id,
                elapsed_ms,
                error = %format!("{err:#}"),
                "task failed"
            );
            (TaskOutcome::Failed, Vec::new())
        }
        Err(join_err) => {
            error!(
                task = %task.name,
                run_id = task.run_id,
                error = %join_err,
                "task panicked"
            );
            (TaskOutcome::Failed, Vec::new())
        }
    }
}

/// `dist/css/main.css` -> `css/main.css`, the path a browser requests.
fn relative_url(path: &Path, dist_root: &Path) -> Option<String> {
    let rel = path.strip_prefix(dist_root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_url_uses_forward_slashes() {
        let dist = Path::new("/site/dist");
        assert_eq!(
            relative_url(&dist.join("css").join("main.css"), dist).as_deref(),
            Some("css/main.css")
        );
        assert_eq!(relative_url(Path::new("/elsewhere/x.css"), dist), None);
    }
}
