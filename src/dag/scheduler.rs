use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::dag::graph::BuildGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::ExecOutcome;
use crate::report::TaskOutcome;
use crate::task::TaskId;
use crate::types::FailureMode;

/// Scheduler holds the immutable graph plus mutable per-build state.
///
/// It is responsible for:
/// - deciding when a task is "ready" to run (all producers succeeded)
/// - keeping at most `jobs` tasks dispatched at once
/// - recording each task's outcome
/// - blocking dependents when a task fails
/// - stopping dispatch after a failure under [`FailureMode::Stop`]
///
/// It performs no IO and never blocks; the engine feeds it completions one at
/// a time, which makes it the single coordinating point of a build.
#[derive(Debug)]
pub struct Scheduler {
    graph: BuildGraph,
    tasks: BTreeMap<TaskId, TaskInfo>,
    jobs: usize,
    failure_mode: FailureMode,
    /// Set once a failure is seen under `FailureMode::Stop`.
    halted: bool,
    started: bool,
}

impl Scheduler {
    /// Construct a scheduler for a validated [`BuildGraph`].
    ///
    /// `jobs` is clamped to at least 1.
    pub fn new(graph: BuildGraph, jobs: usize, failure_mode: FailureMode) -> Self {
        let tasks = graph
            .tasks()
            .map(|id| {
                let deps = graph.dependencies_of(id).to_vec();
                (id.to_string(), TaskInfo::new(id.to_string(), deps))
            })
            .collect();

        Self {
            graph,
            tasks,
            jobs: jobs.max(1),
            failure_mode,
            halted: false,
            started: false,
        }
    }

    pub fn graph(&self) -> &BuildGraph {
        &self.graph
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        self.tasks.get(task).map(|info| (&info.run_state).into())
    }

    /// Whether every producer of `task` has completed successfully.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        let mgr = ReadOnlyStateManager::new(&self.tasks);
        Some(mgr.deps_satisfied_for_info(info))
    }

    /// Number of tasks currently dispatched.
    pub fn running(&self) -> usize {
        ReadOnlyStateManager::new(&self.tasks).running_count()
    }

    /// Whether every task has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.tasks.values().all(|info| info.run_state.is_terminal())
    }

    /// Dispatch the initial ready set (production API).
    pub fn start(&mut self) -> Vec<ScheduledTask> {
        self.step_start().newly_scheduled
    }

    /// Handle completion of a dispatched task (production API).
    pub fn handle_completion(&mut self, task: &str, outcome: ExecOutcome) -> Vec<ScheduledTask> {
        self.step_completion(task, outcome).newly_scheduled
    }

    /// Manual-step variant of `start` that returns a rich [`SchedulerStep`].
    pub fn step_start(&mut self) -> SchedulerStep {
        if self.started {
            warn!("scheduler already started; ignoring");
            return SchedulerStep {
                build_finished: self.is_finished(),
                ..SchedulerStep::default()
            };
        }
        self.started = true;

        info!(
            tasks = self.tasks.len(),
            jobs = self.jobs,
            failure_mode = ?self.failure_mode,
            "scheduler: starting build"
        );

        let newly_scheduled = self.dispatch_ready();
        SchedulerStep {
            newly_scheduled,
            build_finished: self.is_finished(),
            ..SchedulerStep::default()
        }
    }

    /// Manual-step variant of `handle_completion` that returns a rich
    /// [`SchedulerStep`].
    pub fn step_completion(&mut self, task: &str, outcome: ExecOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        match self.tasks.get_mut(task) {
            Some(info) if info.run_state == RunState::Running => match outcome {
                ExecOutcome::Succeeded => {
                    info.run_state = RunState::Succeeded;
                    debug!(task = %info.id, "task succeeded");
                }
                ExecOutcome::Fresh => {
                    info.run_state = RunState::Fresh;
                    debug!(task = %info.id, "task fresh; skipped");
                }
                ExecOutcome::Failed(reason) => {
                    warn!(
                        task = %info.id,
                        reason = %reason,
                        "task failed; blocking dependents"
                    );
                    info.run_state = RunState::Failed(reason);
                    step.newly_failed.push(task.to_string());

                    let mut manager = StateManager::new(&self.graph, &mut self.tasks);
                    step.newly_blocked = manager.mark_dependents_blocked(task);

                    if self.failure_mode == FailureMode::Stop && !self.halted {
                        info!(task = %task, "stop-on-failure: no further tasks will be dispatched");
                        self.halted = true;
                    }
                }
            },
            Some(info) => {
                warn!(
                    task = %task,
                    state = ?info.run_state,
                    "completion for task that is not running; ignoring"
                );
            }
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        step.newly_scheduled = self.dispatch_ready();

        if self.halted {
            let mut manager = StateManager::new(&self.graph, &mut self.tasks);
            if manager.running_count() == 0 {
                step.newly_cancelled = manager.cancel_pending();
            }
        }

        step.build_finished = self.is_finished();
        if step.build_finished {
            info!("scheduler: all tasks terminal; build finished");
        }
        step
    }

    /// Stop dispatching new tasks, as if a failure had been seen under
    /// [`FailureMode::Stop`]. Running tasks finish; waiting ones are
    /// cancelled once nothing is running.
    pub fn request_stop(&mut self) -> SchedulerStep {
        let mut step = SchedulerStep::default();
        if !self.halted {
            info!("scheduler: stop requested");
            self.halted = true;
        }

        let mut manager = StateManager::new(&self.graph, &mut self.tasks);
        if manager.running_count() == 0 {
            step.newly_cancelled = manager.cancel_pending();
        }

        step.build_finished = self.is_finished();
        step
    }

    /// Final outcome per task. Tasks that never reached a terminal state are
    /// reported as cancelled.
    pub fn outcomes(&self) -> BTreeMap<TaskId, TaskOutcome> {
        self.tasks
            .iter()
            .map(|(id, info)| {
                let outcome = match &info.run_state {
                    RunState::Succeeded => TaskOutcome::Succeeded,
                    RunState::Fresh => TaskOutcome::Fresh,
                    RunState::Failed(reason) => TaskOutcome::Failed {
                        reason: reason.clone(),
                    },
                    RunState::Blocked(upstream) => TaskOutcome::Blocked {
                        upstream: upstream.clone(),
                    },
                    RunState::Cancelled | RunState::Pending | RunState::Running => {
                        TaskOutcome::Cancelled
                    }
                };
                (id.clone(), outcome)
            })
            .collect()
    }

    fn dispatch_ready(&mut self) -> Vec<ScheduledTask> {
        if self.halted {
            return Vec::new();
        }
        let mut manager = StateManager::new(&self.graph, &mut self.tasks);
        let capacity = self.jobs.saturating_sub(manager.running_count());
        manager.collect_new_ready_tasks(capacity)
    }
}
