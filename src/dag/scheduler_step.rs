// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::ScheduledTask;
use crate::task::TaskId;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step the graph and make
/// assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready and were dispatched in this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Tasks newly marked failed in this step (at most the completed task).
    pub newly_failed: Vec<TaskId>,
    /// Downstream tasks newly blocked by a failure in this step.
    pub newly_blocked: Vec<TaskId>,
    /// Tasks cancelled because the build is stopping.
    pub newly_cancelled: Vec<TaskId>,
    /// Whether this step left every task in a terminal state.
    pub build_finished: bool,
}
