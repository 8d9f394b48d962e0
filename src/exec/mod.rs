// src/exec/mod.rs

//! Task execution layer.
//!
//! This module is responsible for actually running scheduled tasks against
//! the content store and reporting back to the orchestration runtime via
//! `EngineEvent`s.
//!
//! - [`runner`] runs one task: staleness check, `apply`, atomic commit.
//! - [`pool`] is the production backend: a bounded pool of blocking workers.
//! - [`backend`] provides the `ExecutorBackend` trait the runtime talks to,
//!   and which tests can replace with a fake implementation.

pub mod backend;
pub mod pool;
pub mod runner;

pub use backend::ExecutorBackend;
pub use pool::WorkerPool;
pub use runner::run_task;
