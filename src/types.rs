use std::str::FromStr;
use serde::Deserialize;

/// What the scheduler does once a task has failed.
///
/// - `Continue`: keep running every task that is not downstream of the
///   failure (default behaviour).
/// - `Stop`: dispatch nothing new. Tasks already running are allowed to
///   finish; everything still waiting is reported as cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    Continue,
    Stop,
}

impl Default for FailureMode {
    fn default() -> Self {
        FailureMode::Continue
    }
}

impl FromStr for FailureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Ok(FailureMode::Continue),
            "stop" => Ok(FailureMode::Stop),
            other => Err(format!(
                "invalid failure_mode: {other} (expected \"continue\" or \"stop\")"
            )),
        }
    }
}

/// Log verbosity, as accepted in `[build].log_level` and `BUILDGRAPH_LOG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("invalid log level: {other}")),
        }
    }
}
