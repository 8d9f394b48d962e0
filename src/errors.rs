// src/errors.rs

//! Crate-wide errors.
//!
//! These are the fatal, setup-time errors: a build that returns one never
//! ran a task. Individual task failures are not errors at this level; they
//! are recorded in the [`BuildReport`](crate::report::BuildReport).

use thiserror::Error;

use crate::artifact::ArtifactPath;
use crate::store::StoreError;
use crate::task::TaskId;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Duplicate task id: {0}")]
    DuplicateTask(TaskId),

    #[error("Output '{path}' is produced by both '{first}' and '{second}'")]
    DuplicateProducer {
        path: ArtifactPath,
        first: TaskId,
        second: TaskId,
    },

    #[error("Task '{task}' reads '{path}', which no task produces and the store does not hold")]
    DanglingInput { task: TaskId, path: ArtifactPath },

    #[error("Task '{task}' has an invalid input pattern: {source}")]
    InvalidPattern {
        task: TaskId,
        #[source]
        source: globset::Error,
    },

    #[error("Cycle detected in build graph: {}", .0.join(" -> "))]
    Cycle(Vec<TaskId>),

    #[error("Platform '{platform}' failed to initialise: {source}")]
    Platform {
        platform: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildError>;
