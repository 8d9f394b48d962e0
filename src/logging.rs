// src/logging.rs

//! Logging setup for `buildgraph` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. the level passed by the caller (e.g. `[build].log_level`)
//! 2. `BUILDGRAPH_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that stdout stays free for build reports.

use anyhow::{Result, anyhow};
use tracing_subscriber::fmt;

use crate::types::LogLevel;

/// Environment variable consulted when no explicit level is given.
pub const LOG_ENV_VAR: &str = "BUILDGRAPH_LOG";

/// Initialise global logging subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(level: Option<LogLevel>) -> Result<()> {
    let level = effective_level(level, std::env::var(LOG_ENV_VAR).ok().as_deref());

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

/// Resolve the level from an explicit choice and the environment value.
pub fn effective_level(explicit: Option<LogLevel>, env: Option<&str>) -> tracing::Level {
    explicit
        .or_else(|| env.and_then(|s| s.parse::<LogLevel>().ok()))
        .map(level_from_log_level)
        .unwrap_or(tracing::Level::INFO)
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}
