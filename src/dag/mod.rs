// src/dag/mod.rs

//! Task graph composition and scheduling.
//!
//! - [`pipeline`] composes tasks in series/parallel and compiles them into a
//!   [`DagGraph`].
//! - [`graph`] holds the directed acyclic graph of tasks.
//! - [`outputs`] checks that concurrently runnable tasks write disjoint files.
//! - [`scheduler`] contains the per-run state machine that decides which
//!   tasks are ready to run, and when dependents can be scheduled.
//! - [`task_info`], [`scheduler_step`] and [`state_manager`] support it.

pub mod graph;
pub mod outputs;
pub mod pipeline;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::DagGraph;
pub use outputs::{OutputPlan, check_disjoint_outputs};
pub use pipeline::Pipeline;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
