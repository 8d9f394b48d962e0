// src/task/group.rs

use std::sync::Arc;

use anyhow::Result;

use crate::task::{Task, TaskContext, TaskId};

/// A composite task: it only groups other tasks.
///
/// The graph builder expands a group into its members (recursively) and never
/// schedules the group itself. Platforms typically return one of these from
/// `initialise`.
#[derive(Debug, Clone)]
pub struct TaskGroup {
    id: TaskId,
    members: Vec<Arc<dyn Task>>,
}

impl TaskGroup {
    pub fn new(id: impl Into<TaskId>) -> Self {
        Self {
            id: id.into(),
            members: Vec::new(),
        }
    }

    pub fn with(mut self, task: Arc<dyn Task>) -> Self {
        self.members.push(task);
        self
    }

    pub fn push(&mut self, task: Arc<dyn Task>) {
        self.members.push(task);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn into_task(self) -> Arc<dyn Task> {
        Arc::new(self)
    }
}

impl Task for TaskGroup {
    fn id(&self) -> TaskId {
        self.id.clone()
    }

    fn apply(&self, _ctx: &mut TaskContext) -> Result<bool> {
        Ok(true)
    }

    fn subtasks(&self) -> Vec<Arc<dyn Task>> {
        self.members.clone()
    }

    fn is_composite(&self) -> bool {
        true
    }
}
