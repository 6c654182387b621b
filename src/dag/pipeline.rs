// src/dag/pipeline.rs

//! Series/parallel composition of tasks, compiled into a [`DagGraph`].
//!
//! Composition rules:
//! - `Series([s1, s2, ...])`: every exit task of `s1` becomes a dependency
//!   of every entry task of `s2`, and so on. Empty stages are skipped.
//! - `Parallel([p1, p2, ...])`: no edges between branches; entries and exits
//!   are the union of the branches'.
//!
//! When `clean` is part of a pipeline every other task must be ordered after
//! it, otherwise a writer could race the deletion of the output root.

use crate::dag::DagGraph;
use crate::engine::TaskName;
use crate::errors::{AssetpipeError, Result};
use crate::types::{Target, TaskKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pipeline {
    Task(TaskName),
    Series(Vec<Pipeline>),
    Parallel(Vec<Pipeline>),
}

#[derive(Debug, Default)]
struct Endpoints {
    entries: Vec<TaskName>,
    exits: Vec<TaskName>,
}

impl Endpoints {
    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Pipeline {
    pub fn task(kind: TaskKind) -> Self {
        Pipeline::Task(kind.as_str().to_string())
    }

    pub fn series(stages: impl IntoIterator<Item = Pipeline>) -> Self {
        Pipeline::Series(stages.into_iter().collect())
    }

    pub fn parallel(branches: impl IntoIterator<Item = Pipeline>) -> Self {
        Pipeline::Parallel(branches.into_iter().collect())
    }

    fn parallel_tasks(kinds: &[TaskKind]) -> Self {
        Self::parallel(kinds.iter().copied().map(Pipeline::task))
    }

    /// `clean → parallel{css, mincss, js, minjs, html, copy, minimages}`
    pub fn production() -> Self {
        Self::series([
            Pipeline::task(TaskKind::Clean),
            Self::parallel_tasks(&[
                TaskKind::Css,
                TaskKind::MinCss,
                TaskKind::Js,
                TaskKind::MinJs,
                TaskKind::Html,
                TaskKind::Copy,
                TaskKind::MinImages,
            ]),
        ])
    }

    /// Tasks re-run by watch bindings in development mode.
    pub fn development_tasks() -> [TaskKind; 5] {
        [
            TaskKind::Css,
            TaskKind::Js,
            TaskKind::Html,
            TaskKind::Copy,
            TaskKind::CopyImages,
        ]
    }

    /// `clean → parallel{css, js, html, copy, copyimages}`
    ///
    /// The preview server and the watch bindings are started by the
    /// orchestrator once this graph has run to completion.
    pub fn development() -> Self {
        Self::series([
            Pipeline::task(TaskKind::Clean),
            Self::parallel_tasks(&Self::development_tasks()),
        ])
    }

    pub fn for_target(target: Target) -> Self {
        match target {
            Target::Build => Self::production(),
            Target::Serve | Target::Watch => Self::development(),
            Target::Task(kind) => Pipeline::task(kind),
        }
    }

    /// Compile into a validated DAG.
    pub fn compile(&self) -> Result<DagGraph> {
        let mut graph = DagGraph::new();
        self.wire(&mut graph)?;
        graph.topological_order()?;
        ensure_clean_runs_first(&graph)?;
        Ok(graph)
    }

    fn wire(&self, graph: &mut DagGraph) -> Result<Endpoints> {
        match self {
            Pipeline::Task(name) => {
                graph.add_task(name)?;
                Ok(Endpoints {
                    entries: vec![name.clone()],
                    exits: vec![name.clone()],
                })
            }
            Pipeline::Series(stages) => {
                let mut acc = Endpoints::default();
                for stage in stages {
                    let next = stage.wire(graph)?;
                    if next.is_empty() {
                        continue;
                    }
                    if acc.is_empty() {
                        acc = next;
                        continue;
                    }
                    for exit in acc.exits.iter() {
                        for entry in next.entries.iter() {
                            graph.add_edge(exit, entry);
                        }
                    }
                    acc.exits = next.exits;
                }
                Ok(acc)
            }
            Pipeline::Parallel(branches) => {
                let mut acc = Endpoints::default();
                for branch in branches {
                    let next = branch.wire(graph)?;
                    acc.entries.extend(next.entries);
                    acc.exits.extend(next.exits);
                }
                Ok(acc)
            }
        }
    }
}

fn ensure_clean_runs_first(graph: &DagGraph) -> Result<()> {
    let clean = TaskKind::Clean.as_str();
    if !graph.contains(clean) {
        return Ok(());
    }

    for task in graph.tasks() {
        if task != clean && !graph.is_ancestor(clean, task) {
            return Err(AssetpipeError::InvalidPipeline(format!(
                "task '{task}' is not ordered after '{clean}' and could write while the output root is deleted"
            )));
        }
    }
    Ok(())
}
