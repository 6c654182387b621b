// src/dag/outputs.rs

//! Output disjointness check.
//!
//! Tasks that may run at the same time must never write the same file.
//! `clean` plans nothing: it is ordered before every writer in any pipeline
//! that contains it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::debug;

use crate::dag::DagGraph;
use crate::engine::TaskName;
use crate::errors::{AssetpipeError, Result};

/// Files a task would write in the current source tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputPlan {
    pub task: TaskName,
    pub files: BTreeSet<PathBuf>,
}

impl OutputPlan {
    pub fn new(task: impl Into<TaskName>, files: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            task: task.into(),
            files: files.into_iter().collect(),
        }
    }
}

/// Fail with [`AssetpipeError::OutputConflict`] if two tasks that may run
/// concurrently in `graph` plan the same output file.
pub fn check_disjoint_outputs(graph: &DagGraph, plans: &[OutputPlan]) -> Result<()> {
    let by_task: BTreeMap<&str, &OutputPlan> =
        plans.iter().map(|p| (p.task.as_str(), p)).collect();

    for (a, b) in graph.concurrent_pairs() {
        let (Some(first), Some(second)) = (by_task.get(a.as_str()), by_task.get(b.as_str()))
        else {
            continue;
        };

        if let Some(path) = first.files.intersection(&second.files).next() {
            return Err(AssetpipeError::OutputConflict {
                first: a,
                second: b,
                path: path.clone(),
            });
        }
    }

    debug!(tasks = plans.len(), "planned outputs are disjoint");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(task: &str, files: &[&str]) -> OutputPlan {
        OutputPlan::new(task, files.iter().map(PathBuf::from))
    }

    #[test]
    fn overlapping_parallel_writers_conflict() {
        let graph = DagGraph::from_edges(&["a", "b"], &[]).unwrap();
        let plans = [
            plan("a", &["dist/images/logo.png"]),
            plan("b", &["dist/images/logo.png", "dist/images/x.png"]),
        ];

        match check_disjoint_outputs(&graph, &plans) {
            Err(AssetpipeError::OutputConflict { first, second, path }) => {
                assert_eq!((first.as_str(), second.as_str()), ("a", "b"));
                assert_eq!(path, PathBuf::from("dist/images/logo.png"));
            }
            other => panic!("expected OutputConflict, got {other:?}"),
        }
    }

    #[test]
    fn ordered_writers_may_share_outputs() {
        let graph = DagGraph::from_edges(&["a", "b"], &[("a", "b")]).unwrap();
        let plans = [plan("a", &["dist/x"]), plan("b", &["dist/x"])];
        assert!(check_disjoint_outputs(&graph, &plans).is_ok());
    }

    #[test]
    fn same_directory_different_files_is_fine() {
        let graph = DagGraph::from_edges(&["css", "mincss"], &[]).unwrap();
        let plans = [
            plan("css", &["dist/css/main.css", "dist/css/main.css.map"]),
            plan("mincss", &["dist/css/main.min.css", "dist/css/main.min.css.map"]),
        ];
        assert!(check_disjoint_outputs(&graph, &plans).is_ok());
    }
}
