// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`EngineEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//!
//! The core is intended to be unit tested without any Tokio, channels,
//! stores, or real tasks.

use std::collections::BTreeMap;

use crate::dag::{ScheduledTask, Scheduler, SchedulerStep};
use crate::engine::EngineEvent;
use crate::report::TaskOutcome;
use crate::task::TaskId;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Pure core runtime state.
///
/// It owns the scheduler and has **no** channels, no Tokio types, and does
/// not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Expose whether every task is terminal (for tests).
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_finished()
    }

    /// Kick off the build: dispatch everything that is ready up front.
    pub fn start(&mut self) -> CoreStep {
        let step = self.scheduler.step_start();
        into_core_step(step)
    }

    /// Handle a single event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: EngineEvent) -> CoreStep {
        let step = match event {
            EngineEvent::TaskCompleted { task, outcome } => {
                self.scheduler.step_completion(&task, outcome)
            }
            EngineEvent::ShutdownRequested => self.scheduler.request_stop(),
        };
        into_core_step(step)
    }

    pub fn outcomes(&self) -> BTreeMap<TaskId, TaskOutcome> {
        self.scheduler.outcomes()
    }
}

fn into_core_step(step: SchedulerStep) -> CoreStep {
    let mut commands = Vec::new();
    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }
    CoreStep {
        commands,
        keep_running: !step.build_finished,
    }
}
