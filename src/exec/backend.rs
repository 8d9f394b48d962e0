// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning work
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production implementation in [`pool`](super::pool).

use std::future::Future;
use std::pin::Pin;

use crate::dag::ScheduledTask;
use crate::errors::Result;

/// Trait abstracting how scheduled tasks are executed.
///
/// Production code uses [`WorkerPool`](super::WorkerPool); tests can provide
/// their own implementation that never touches a store.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    ///
    /// Implementations must eventually emit exactly one
    /// `EngineEvent::TaskCompleted` per dispatched task, and must not block
    /// the caller until the tasks finish.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
