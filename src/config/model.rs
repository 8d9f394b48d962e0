// src/config/model.rs

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use serde::Deserialize;

use crate::types::{FailureMode, LogLevel};

/// Configuration exactly as read from a TOML file.
///
/// ```toml
/// [build]
/// jobs = 4
/// failure_mode = "stop"
/// log_level = "debug"
///
/// [platform.whiley]
/// source_root = "/src"
/// ```
///
/// Every section is optional. Nothing here has been validated yet; see
/// [`ConfigFile`] for that.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub build: BuildSection,

    /// Free-form settings per platform, keyed by platform name.
    #[serde(default)]
    pub platform: BTreeMap<String, toml::Table>,
}

/// `[build]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Worker count. `None` means "use available parallelism".
    #[serde(default)]
    pub jobs: Option<usize>,

    #[serde(default)]
    pub failure_mode: FailureMode,

    #[serde(default)]
    pub log_level: Option<LogLevel>,
}

/// A validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (or
/// [`load_and_validate`](super::load_and_validate)).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub build: BuildSection,
    pub platform: BTreeMap<String, toml::Table>,
}

impl ConfigFile {
    /// Internal constructor used after validation has already run.
    pub(crate) fn new_unchecked(
        build: BuildSection,
        platform: BTreeMap<String, toml::Table>,
    ) -> Self {
        Self { build, platform }
    }

    /// Settings table for platform `name`, empty if not configured.
    pub fn platform_settings(&self, name: &str) -> toml::Table {
        self.platform.get(name).cloned().unwrap_or_default()
    }

    pub fn log_level(&self) -> Option<LogLevel> {
        self.build.log_level
    }

    pub fn options(&self) -> BuildOptions {
        BuildOptions::from_config(self)
    }
}

/// Runtime knobs for one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Maximum number of tasks running at once. Always at least 1.
    pub jobs: usize,
    pub failure_mode: FailureMode,
}

impl BuildOptions {
    pub fn new(jobs: usize, failure_mode: FailureMode) -> Self {
        Self {
            jobs: jobs.max(1),
            failure_mode,
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        let jobs = cfg.build.jobs.unwrap_or_else(default_jobs);
        Self::new(jobs, cfg.build.failure_mode)
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_failure_mode(mut self, failure_mode: FailureMode) -> Self {
        self.failure_mode = failure_mode;
        self
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::new(default_jobs(), FailureMode::default())
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
