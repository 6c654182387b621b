// src/dag/graph.rs

use std::collections::BTreeMap;

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::engine::TaskName;
use crate::errors::{AssetpipeError, Result};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: tasks that must succeed before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
}

/// In-memory task DAG keyed by task name.
///
/// Usually produced by [`crate::dag::Pipeline::compile`]. Adjacency lives in a
/// `BTreeMap` so iteration order (and therefore log output and dispatch
/// order) is stable between runs.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    nodes: BTreeMap<TaskName, DagNode>,
}

impl DagGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from explicit nodes and `(dependency, dependent)` edges.
    ///
    /// Fails on unknown edge endpoints, duplicate nodes and cycles.
    pub fn from_edges(tasks: &[&str], edges: &[(&str, &str)]) -> Result<Self> {
        let mut graph = Self::new();
        for task in tasks {
            graph.add_task(task)?;
        }
        for (dep, task) in edges {
            for name in [dep, task] {
                if !graph.contains(name) {
                    return Err(AssetpipeError::TaskNotFound(name.to_string()));
                }
            }
            graph.add_edge(dep, task);
        }
        graph.topological_order()?;
        Ok(graph)
    }

    pub(crate) fn add_task(&mut self, name: &str) -> Result<()> {
        if self.nodes.contains_key(name) {
            return Err(AssetpipeError::InvalidPipeline(format!(
                "task '{name}' appears more than once"
            )));
        }
        self.nodes.insert(name.to_string(), DagNode::default());
        Ok(())
    }

    /// Add `dep -> task`. Both nodes must already exist; repeated edges are
    /// ignored.
    pub(crate) fn add_edge(&mut self, dep: &str, task: &str) {
        if let Some(node) = self.nodes.get_mut(task) {
            if !node.deps.iter().any(|d| d == dep) {
                node.deps.push(dep.to_string());
            }
        }
        if let Some(node) = self.nodes.get_mut(dep) {
            if !node.dependents.iter().any(|d| d == task) {
                node.dependents.push(task.to_string());
            }
        }
    }

    /// Return all task names.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks without dependencies; these seed a pipeline run.
    pub fn roots(&self) -> Vec<TaskName> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.deps.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn to_petgraph(&self) -> DiGraphMap<&str, ()> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in self.nodes.keys() {
            graph.add_node(name.as_str());
        }
        for (name, node) in self.nodes.iter() {
            for dep in node.deps.iter() {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }
        graph
    }

    /// Dependencies-first ordering of all tasks.
    pub fn topological_order(&self) -> Result<Vec<TaskName>> {
        let graph = self.to_petgraph();
        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
            Err(cycle) => Err(AssetpipeError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                cycle.node_id()
            ))),
        }
    }

    /// Whether `ancestor` must finish before `task` may start.
    pub fn is_ancestor(&self, ancestor: &str, task: &str) -> bool {
        if ancestor == task || !self.contains(ancestor) || !self.contains(task) {
            return false;
        }
        let graph = self.to_petgraph();
        has_path_connecting(&graph, ancestor, task, None)
    }

    /// All unordered pairs of tasks that the scheduler may run at the same
    /// time, i.e. neither is an ancestor of the other.
    pub fn concurrent_pairs(&self) -> Vec<(TaskName, TaskName)> {
        let graph = self.to_petgraph();
        let names: Vec<&str> = self.tasks().collect();
        let mut pairs = Vec::new();

        for (i, a) in names.iter().enumerate() {
            for b in names.iter().skip(i + 1) {
                let ordered = has_path_connecting(&graph, *a, *b, None)
                    || has_path_connecting(&graph, *b, *a, None);
                if !ordered {
                    pairs.push((a.to_string(), b.to_string()));
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_edges_rejects_cycles() {
        let err = DagGraph::from_edges(&["a", "b"], &[("a", "b"), ("b", "a")]).unwrap_err();
        assert!(matches!(err, AssetpipeError::DagCycle(_)));
    }

    #[test]
    fn from_edges_rejects_unknown_endpoints() {
        let err = DagGraph::from_edges(&["a"], &[("a", "ghost")]).unwrap_err();
        assert!(matches!(err, AssetpipeError::TaskNotFound(name) if name == "ghost"));
    }

    #[test]
    fn concurrent_pairs_excludes_transitively_ordered_tasks() {
        let graph =
            DagGraph::from_edges(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("a", "d")])
                .unwrap();

        let pairs = graph.concurrent_pairs();
        assert_eq!(
            pairs,
            vec![
                ("b".to_string(), "d".to_string()),
                ("c".to_string(), "d".to_string())
            ]
        );
        assert!(graph.is_ancestor("a", "c"));
        assert!(!graph.is_ancestor("c", "a"));
    }

    #[test]
    fn roots_are_tasks_without_dependencies() {
        let graph = DagGraph::from_edges(&["a", "b", "c"], &[("a", "b")]).unwrap();
        assert_eq!(graph.roots(), vec!["a".to_string(), "c".to_string()]);
    }
}
