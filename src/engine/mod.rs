// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the scheduler (which tasks are ready, what failure blocks)
//! - the executor backend (where tasks actually run)
//! - the main event loop that reacts to:
//!   - task completion events
//!   - shutdown requests
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::task::TaskId;

/// Result of running one task, as reported by an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The task ran and its outputs were committed.
    Succeeded,
    /// The task was up to date and did not run.
    Fresh,
    /// The task ran (or tried to) and nothing was committed.
    Failed(String),
}

/// Events flowing into the runtime from executors and the driver.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A dispatched task finished.
    TaskCompleted { task: TaskId, outcome: ExecOutcome },
    /// Stop dispatching; let running tasks finish, cancel the rest.
    ShutdownRequested,
}

pub mod core;
pub mod runtime;

pub use self::core::{CoreCommand, CoreRuntime, CoreStep};
pub use self::runtime::Runtime;
