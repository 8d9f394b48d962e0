// src/dag/mod.rs

//! Build graph representation and scheduling.
//!
//! - [`graph`] derives the dependency graph from task declarations.
//! - [`scheduler`] contains the per-build state machine that decides
//!   which tasks are ready to run, and what happens when one fails.
//! - [`task_info`] provides task metadata and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-build state transitions.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::{BuildGraph, TaskNode};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
