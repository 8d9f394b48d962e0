// src/dag/state_manager.rs

//! Per-build state management for tasks in the scheduler.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::BuildGraph;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::task::TaskId;

/// Manages per-build state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a BuildGraph,
    tasks: &'a mut BTreeMap<TaskId, TaskInfo>,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a BuildGraph, tasks: &'a mut BTreeMap<TaskId, TaskInfo>) -> Self {
        Self { graph, tasks }
    }

    /// Determine whether every producer of the given task has completed
    /// successfully (ran or was fresh) in this build.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        let ro = ReadOnlyStateManager::new(self.tasks);
        ro.deps_satisfied_for_info(info)
    }

    /// Mark every transitive dependent of a failed task as blocked.
    ///
    /// Returns the tasks newly blocked. A task already blocked by another
    /// failure keeps its original upstream.
    pub fn mark_dependents_blocked(&mut self, failed_task: &str) -> Vec<TaskId> {
        let mut stack: Vec<TaskId> = self.graph.dependents_of(failed_task).to_vec();
        let mut visited: BTreeSet<TaskId> = BTreeSet::new();
        let mut newly_blocked = Vec::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            let Some(info) = self.tasks.get_mut(&name) else {
                warn!(task = %name, "node in graph not present in tasks map");
                continue;
            };

            match info.run_state {
                RunState::Pending => {
                    info.run_state = RunState::Blocked(failed_task.to_string());
                    debug!(
                        task = %info.id,
                        upstream = %failed_task,
                        "blocked by upstream failure"
                    );
                    newly_blocked.push(info.id.clone());
                    stack.extend(self.graph.dependents_of(&name).iter().cloned());
                }
                RunState::Running => {
                    // Cannot happen: a running task had all producers succeed.
                    warn!(task = %info.id, "dependent of failed task is already running");
                }
                _ => {
                    // Already terminal.
                }
            }
        }

        newly_blocked.sort();
        newly_blocked
    }

    /// Collect `Pending` tasks whose producers are all satisfied, up to
    /// `capacity` of them in id order, mark them `Running`, and return them
    /// as `ScheduledTask`s.
    pub fn collect_new_ready_tasks(&mut self, capacity: usize) -> Vec<ScheduledTask> {
        if capacity == 0 {
            return Vec::new();
        }

        // Decide first, then mutate to avoid borrowing issues.
        let candidates: Vec<TaskId> = self
            .tasks
            .values()
            .filter(|info| {
                info.run_state == RunState::Pending && self.deps_satisfied_for_info(info)
            })
            .take(capacity)
            .map(|info| info.id.clone())
            .collect();

        let mut ready = Vec::with_capacity(candidates.len());
        for id in candidates {
            let Some(node) = self.graph.node(&id) else {
                warn!(task = %id, "ready task missing from graph");
                continue;
            };
            if let Some(info) = self.tasks.get_mut(&id) {
                info!(task = %info.id, "dispatching task");
                info.run_state = RunState::Running;
                ready.push(ScheduledTask {
                    id: id.clone(),
                    node: Arc::clone(node),
                });
            }
        }

        ready
    }

    /// Cancel every task still waiting. Used when stopping on failure.
    pub fn cancel_pending(&mut self) -> Vec<TaskId> {
        let mut cancelled = Vec::new();
        for info in self.tasks.values_mut() {
            if info.run_state == RunState::Pending {
                info.run_state = RunState::Cancelled;
                debug!(task = %info.id, "cancelled; build is stopping");
                cancelled.push(info.id.clone());
            }
        }
        cancelled
    }

    /// Number of tasks currently dispatched.
    pub fn running_count(&self) -> usize {
        ReadOnlyStateManager::new(self.tasks).running_count()
    }
}

/// A read-only view of the state manager for checking dependency satisfaction.
///
/// This is used when we only have shared access to the tasks map (e.g. in
/// `Scheduler::deps_satisfied`).
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a BTreeMap<TaskId, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a BTreeMap<TaskId, TaskInfo>) -> Self {
        Self { tasks }
    }

    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_name| match self.tasks.get(dep_name) {
            Some(dep) => dep.run_state.satisfies_dependents(),
            None => {
                warn!(
                    task = %info.id,
                    dep = %dep_name,
                    "dependency missing from tasks map"
                );
                false
            }
        })
    }

    pub fn running_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|info| info.run_state == RunState::Running)
            .count()
    }
}
