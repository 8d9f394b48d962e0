// src/report.rs

//! Build reports handed back to the driver.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use crate::artifact::ArtifactPath;
use crate::task::TaskId;

/// Final outcome of one task in one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Ran, succeeded, outputs committed.
    Succeeded,
    /// Ran and failed; nothing committed.
    Failed { reason: String },
    /// Skipped: outputs already derived from the current inputs.
    Fresh,
    /// Not attempted because `upstream` failed.
    Blocked { upstream: TaskId },
    /// Not attempted because the build stopped on an earlier failure.
    Cancelled,
}

impl TaskOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded | TaskOutcome::Fresh)
    }

    /// Whether the task body actually ran.
    pub fn was_executed(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded | TaskOutcome::Failed { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            TaskOutcome::Succeeded => "ran-succeeded",
            TaskOutcome::Failed { .. } => "ran-failed",
            TaskOutcome::Fresh => "skipped-fresh",
            TaskOutcome::Blocked { .. } => "blocked-upstream-failure",
            TaskOutcome::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Failed { reason } => write!(f, "{}: {}", self.label(), reason),
            TaskOutcome::Blocked { upstream } => write!(f, "{} ({})", self.label(), upstream),
            other => f.write_str(other.label()),
        }
    }
}

/// Everything a build did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Outcome of every task in the graph, keyed by task id.
    pub outcomes: BTreeMap<TaskId, TaskOutcome>,
    /// Outputs of failed or blocked tasks that still hold the last good
    /// version. They are older than the current inputs and must not be
    /// trusted as fresh.
    pub stale_artifacts: Vec<ArtifactPath>,
    pub elapsed: Duration,
}

impl BuildReport {
    /// True when every task succeeded or was fresh.
    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(TaskOutcome::is_ok)
    }

    /// Process exit status for a driver: 0 on success, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    pub fn outcome(&self, task: &str) -> Option<&TaskOutcome> {
        self.outcomes.get(task)
    }

    /// Ids of tasks whose body ran (successfully or not).
    pub fn executed(&self) -> Vec<&str> {
        self.select(TaskOutcome::was_executed)
    }

    pub fn fresh(&self) -> Vec<&str> {
        self.select(|o| matches!(o, TaskOutcome::Fresh))
    }

    pub fn failed(&self) -> Vec<&str> {
        self.select(|o| matches!(o, TaskOutcome::Failed { .. }))
    }

    pub fn blocked(&self) -> Vec<&str> {
        self.select(|o| matches!(o, TaskOutcome::Blocked { .. }))
    }

    pub fn cancelled(&self) -> Vec<&str> {
        self.select(|o| matches!(o, TaskOutcome::Cancelled))
    }

    fn select(&self, pred: impl Fn(&TaskOutcome) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| pred(outcome))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Emit a one-line summary, plus one line per task that did not succeed.
    pub fn log_summary(&self) {
        info!(
            tasks = self.outcomes.len(),
            executed = self.executed().len(),
            fresh = self.fresh().len(),
            failed = self.failed().len(),
            blocked = self.blocked().len(),
            cancelled = self.cancelled().len(),
            elapsed_ms = self.elapsed.as_millis() as u64,
            "build finished"
        );
        for (id, outcome) in &self.outcomes {
            if !outcome.is_ok() {
                warn!(task = %id, outcome = %outcome, "task did not complete");
            }
        }
        for path in &self.stale_artifacts {
            warn!(path = %path, "artifact is stale (producer failed)");
        }
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, outcome) in &self.outcomes {
            writeln!(f, "{id}: {outcome}")?;
        }
        for path in &self.stale_artifacts {
            writeln!(f, "stale: {path}")?;
        }
        write!(
            f,
            "{} ({} tasks)",
            if self.is_success() { "ok" } else { "FAILED" },
            self.outcomes.len()
        )
    }
}
