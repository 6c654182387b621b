// tests/scheduler_property.rs

use std::collections::HashSet;

use proptest::prelude::*;

use assetpipe::dag::{DagGraph, Scheduler, TaskRunState};
use assetpipe::engine::TaskOutcome;

/// Random DAGs: task N may only depend on tasks 0..N, so every graph is
/// acyclic by construction.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = DagGraph> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(move |raw_deps| {
            let names: Vec<String> = (0..num_tasks).map(|i| format!("task_{i}")).collect();
            let mut edges = HashSet::new();
            for (i, potential) in raw_deps.into_iter().enumerate() {
                if i == 0 {
                    continue;
                }
                for dep in potential {
                    edges.insert((dep % i, i));
                }
            }

            let tasks: Vec<&str> = names.iter().map(String::as_str).collect();
            let edges: Vec<(&str, &str)> = edges
                .iter()
                .map(|&(dep, task)| (names[dep].as_str(), names[task].as_str()))
                .collect();
            DagGraph::from_edges(&tasks, &edges).expect("generated graph is acyclic")
        })
    })
}

proptest! {
    /// Whatever is triggered and whichever tasks fail, the run finishes and
    /// no task is left pending or running.
    #[test]
    fn scheduler_always_terminates(
        graph in dag_strategy(10),
        rounds in proptest::collection::vec(proptest::collection::vec(0..10usize, 1..4), 1..4),
        failing in proptest::collection::vec(0..10usize, 0..4),
    ) {
        let mut scheduler = Scheduler::new(graph);
        let names: Vec<String> = scheduler.task_names().map(str::to_string).collect();
        let failing: HashSet<String> = failing
            .into_iter()
            .filter(|&i| i < names.len())
            .map(|i| names[i].clone())
            .collect();

        // Several rounds model watch triggers after earlier runs.
        for triggers in rounds {
            let mut executing: Vec<String> = Vec::new();
            for i in triggers.into_iter().filter(|&i| i < names.len()) {
                executing.extend(scheduler.handle_trigger(&names[i]).into_iter().map(|t| t.name));
            }

            let mut steps = 0;
            while let Some(task) = executing.pop() {
                steps += 1;
                prop_assert!(steps < 1000, "scheduler did not settle");

                let outcome = if failing.contains(&task) {
                    TaskOutcome::Failed
                } else {
                    TaskOutcome::Success
                };
                executing.extend(
                    scheduler.handle_completion(&task, outcome).into_iter().map(|t| t.name),
                );
            }

            prop_assert!(scheduler.is_idle(), "run still active with nothing executing");
            for name in names.iter() {
                let state = scheduler.run_state_of(name);
                prop_assert!(
                    !matches!(state, Some(TaskRunState::Pending | TaskRunState::Running)),
                    "{name} left in {state:?}"
                );
            }
        }
    }

    /// Dependencies always finish before their dependents are dispatched.
    #[test]
    fn dependents_never_start_before_dependencies(graph in dag_strategy(8)) {
        let order = graph.topological_order().unwrap();
        let mut scheduler = Scheduler::new(graph.clone());

        let mut finished: HashSet<String> = HashSet::new();
        let mut executing: Vec<String> = Vec::new();
        for root in graph.roots() {
            executing.extend(scheduler.handle_trigger(&root).into_iter().map(|t| t.name));
        }

        while let Some(task) = executing.pop() {
            for dep in graph.dependencies_of(&task) {
                prop_assert!(finished.contains(dep), "{task} dispatched before {dep}");
            }
            finished.insert(task.clone());
            executing.extend(
                scheduler.handle_completion(&task, TaskOutcome::Success).into_iter().map(|t| t.name),
            );
        }

        prop_assert_eq!(finished.len(), order.len());
    }
}
