// src/dag/task_info.rs

//! Task metadata and per-build state.

use std::sync::Arc;

use crate::dag::graph::TaskNode;
use crate::task::TaskId;

/// Per-build state of a task (internal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Waiting on producers (or on a free worker).
    Pending,
    /// Dispatched to the executor.
    Running,
    /// Ran and committed its outputs.
    Succeeded,
    /// Inputs unchanged since its outputs were produced; not run.
    Fresh,
    /// Ran and failed; nothing was committed.
    Failed(String),
    /// Not run because an upstream task failed.
    Blocked(TaskId),
    /// Not run because the build stopped on an earlier failure.
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Pending | RunState::Running)
    }

    /// Whether dependents may consume this task's outputs.
    pub fn satisfies_dependents(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Fresh)
    }
}

/// Public, read-only view of a task's per-build state.
///
/// This is exposed for tests and diagnostics without leaking the internal
/// `RunState` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    Pending,
    Running,
    Succeeded,
    Fresh,
    Failed,
    Blocked,
    Cancelled,
}

impl From<&RunState> for TaskRunState {
    fn from(state: &RunState) -> Self {
        match state {
            RunState::Pending => TaskRunState::Pending,
            RunState::Running => TaskRunState::Running,
            RunState::Succeeded => TaskRunState::Succeeded,
            RunState::Fresh => TaskRunState::Fresh,
            RunState::Failed(_) => TaskRunState::Failed,
            RunState::Blocked(_) => TaskRunState::Blocked,
            RunState::Cancelled => TaskRunState::Cancelled,
        }
    }
}

/// Static task information derived from the graph, plus per-build state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub id: TaskId,
    /// Direct producers this task waits for.
    pub deps: Vec<TaskId>,
    pub run_state: RunState,
}

impl TaskInfo {
    pub fn new(id: TaskId, deps: Vec<TaskId>) -> Self {
        Self {
            id,
            deps,
            run_state: RunState::Pending,
        }
    }
}

/// Description of a task that the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub node: Arc<TaskNode>,
}
