// src/build.rs

//! The build driver.
//!
//! A [`Build`] collects root tasks (directly or from platforms), validates
//! them into a [`BuildGraph`] against a store, and runs the graph to
//! completion. It wires together:
//! - graph construction and the scheduler
//! - the core runtime and its async shell
//! - the worker pool that executes tasks against the store

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::artifact::ArtifactPath;
use crate::config::BuildOptions;
use crate::dag::{BuildGraph, Scheduler};
use crate::engine::{CoreRuntime, EngineEvent, Runtime};
use crate::errors::{BuildError, Result};
use crate::exec::WorkerPool;
use crate::platform::{BuildContext, Platform};
use crate::report::{BuildReport, TaskOutcome};
use crate::store::ContentStore;
use crate::task::{Task, TaskId};

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub struct Build {
    store: Arc<dyn ContentStore>,
    options: BuildOptions,
    roots: Vec<Arc<dyn Task>>,
}

impl std::fmt::Debug for Build {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let roots: Vec<String> = self.roots.iter().map(|t| t.id()).collect();
        f.debug_struct("Build")
            .field("options", &self.options)
            .field("roots", &roots)
            .finish_non_exhaustive()
    }
}

impl Build {
    pub fn new(store: Arc<dyn ContentStore>, options: BuildOptions) -> Self {
        Self {
            store,
            options,
            roots: Vec::new(),
        }
    }

    pub fn options(&self) -> BuildOptions {
        self.options
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Add a root task (possibly a composite).
    pub fn task(mut self, task: Arc<dyn Task>) -> Self {
        self.roots.push(task);
        self
    }

    pub fn add_task(&mut self, task: Arc<dyn Task>) {
        self.roots.push(task);
    }

    /// Ask `platform` for its tasks and add them as a root.
    pub fn add_platform<P>(&mut self, platform: &P, context: &BuildContext) -> Result<()>
    where
        P: Platform + ?Sized,
    {
        let task = platform
            .initialise(context)
            .map_err(|source| BuildError::Platform {
                platform: platform.name().to_string(),
                source,
            })?;
        debug!(platform = platform.name(), task = %task.id(), "platform initialised");
        self.roots.push(task);
        Ok(())
    }

    /// Builder-style [`add_platform`](Self::add_platform).
    pub fn platform<P>(mut self, platform: &P, context: &BuildContext) -> Result<Self>
    where
        P: Platform + ?Sized,
    {
        self.add_platform(platform, context)?;
        Ok(self)
    }

    /// Validate the roots into a graph against the current store contents.
    pub fn graph(&self) -> Result<BuildGraph> {
        BuildGraph::build(&self.roots, self.store.as_ref())
    }

    /// Dry run: the validated graph as waves of tasks that could run
    /// concurrently, in execution order. Nothing is executed.
    pub fn plan(&self) -> Result<Vec<Vec<String>>> {
        let graph = self.graph()?;
        let waves = graph.waves();
        for (i, wave) in waves.iter().enumerate() {
            debug!(wave = i, tasks = ?wave, "planned wave");
        }
        Ok(waves)
    }

    /// Run the build to completion.
    ///
    /// Setup errors (invalid graph, cycles, dangling inputs) are returned
    /// before any task runs. Task failures are not errors: they are
    /// recorded in the returned [`BuildReport`].
    pub async fn run(&self) -> Result<BuildReport> {
        self.run_until(std::future::pending()).await
    }

    /// Like [`run`](Self::run), but once `shutdown` resolves no further
    /// tasks are started. Running tasks finish; the rest are cancelled.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<BuildReport>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let started = Instant::now();

        let graph = self.graph()?;
        info!(
            tasks = graph.len(),
            jobs = self.options.jobs,
            failure_mode = ?self.options.failure_mode,
            "starting build"
        );

        let declared: BTreeMap<TaskId, Vec<ArtifactPath>> = graph
            .tasks()
            .filter_map(|id| graph.node(id))
            .map(|node| {
                let paths = node.outputs.iter().map(|o| o.path.clone()).collect();
                (node.id.clone(), paths)
            })
            .collect();

        let scheduler = Scheduler::new(graph, self.options.jobs, self.options.failure_mode);
        let core = CoreRuntime::new(scheduler);

        let (tx, rx) = mpsc::channel::<EngineEvent>(EVENT_CHANNEL_CAPACITY);
        let executor = WorkerPool::new(Arc::clone(&self.store), tx.clone(), self.options.jobs);

        let shutdown_task = tokio::spawn(async move {
            shutdown.await;
            debug!("shutdown requested");
            let _ = tx.send(EngineEvent::ShutdownRequested).await;
        });

        let runtime = Runtime::new(core, rx, executor);
        let outcomes = runtime.run().await;
        shutdown_task.abort();
        let outcomes = outcomes?;

        let mut report = BuildReport {
            outcomes,
            stale_artifacts: Vec::new(),
            elapsed: started.elapsed(),
        };
        report.stale_artifacts = self.stale_outputs(&report, &declared)?;
        report.log_summary();

        Ok(report)
    }

    /// Remove every declared output of the graph's tasks from the store,
    /// returning the paths that were actually removed.
    pub fn clean(&self) -> Result<Vec<ArtifactPath>> {
        let graph = self.graph()?;
        let mut removed = Vec::new();
        for path in graph.outputs() {
            if self.store.remove(&path)?.is_some() {
                debug!(path = %path, "removed output");
                removed.push(path);
            }
        }
        info!(removed = removed.len(), "clean finished");
        Ok(removed)
    }

    /// Outputs of failed or blocked tasks that still exist from an earlier
    /// build.
    fn stale_outputs(
        &self,
        report: &BuildReport,
        declared: &BTreeMap<TaskId, Vec<ArtifactPath>>,
    ) -> Result<Vec<ArtifactPath>> {
        let mut stale = Vec::new();
        for (id, outcome) in &report.outcomes {
            if !matches!(
                outcome,
                TaskOutcome::Failed { .. } | TaskOutcome::Blocked { .. }
            ) {
                continue;
            }
            for path in declared.get(id).into_iter().flatten() {
                if self.store.contains(path)? {
                    warn!(task = %id, path = %path, outcome = %outcome, "keeping last good output");
                    stale.push(path.clone());
                }
            }
        }
        stale.sort();
        Ok(stale)
    }
}
