// src/platform/mod.rs

//! Pluggable task factories.
//!
//! A platform knows how to turn a build context (settings plus the source
//! set) into tasks for one language or tool, e.g. "compile every `.whiley`
//! file to IR". The engine never sees concrete platform types.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::artifact::ArtifactPath;
use crate::store::StoreView;
use crate::task::Task;

/// Everything a platform needs to initialise its tasks.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    /// Source artifacts the platform should build from, in path order.
    pub sources: Vec<ArtifactPath>,
    /// Platform-specific settings, usually the `[platform.<name>]` table of
    /// `Buildgraph.toml`.
    pub settings: toml::Table,
}

impl BuildContext {
    pub fn new(sources: Vec<ArtifactPath>, settings: toml::Table) -> Self {
        Self { sources, settings }
    }

    /// Collect the source set from every artifact beneath `root`.
    pub fn from_store(
        store: &dyn StoreView,
        root: &ArtifactPath,
        settings: toml::Table,
    ) -> Result<Self> {
        let sources: Vec<ArtifactPath> = store
            .get_all(root)?
            .into_iter()
            .map(|a| a.path().clone())
            .collect();
        debug!(root = %root, count = sources.len(), "collected source set");
        Ok(Self { sources, settings })
    }

    /// A string setting, if present.
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(|v| v.as_str())
    }
}

/// Factory for build tasks.
///
/// `initialise` is called once per build. It may return a single task or a
/// composite ([`TaskGroup`](crate::task::TaskGroup)) describing a whole
/// subgraph. A failure here is a setup error, not a task failure: the build
/// aborts before anything runs.
pub trait Platform<C = BuildContext>: Send + Sync {
    fn name(&self) -> &str;

    fn initialise(&self, context: &C) -> Result<Arc<dyn Task>>;
}
