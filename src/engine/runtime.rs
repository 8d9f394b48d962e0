// src/engine/runtime.rs

use std::collections::BTreeMap;
use std::fmt;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::report::TaskOutcome;
use crate::task::TaskId;

use super::core::CoreRuntime;
use super::{CoreCommand, EngineEvent};

/// Drives the scheduler in response to `EngineEvent`s, and delegates actual
/// task execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. Because every event passes through this single loop,
/// graph state is never touched concurrently.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<EngineEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<EngineEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// - Dispatches the initial ready set.
    /// - Consumes `EngineEvent`s from `event_rx` and feeds them to the core.
    /// - Executes commands returned by the core.
    /// - Returns once every task is terminal.
    pub async fn run(mut self) -> Result<BTreeMap<TaskId, TaskOutcome>> {
        info!("buildgraph runtime started");

        let mut step = self.core.start();

        loop {
            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                break;
            }

            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    return Err(anyhow!(
                        "runtime event channel closed before the build finished"
                    )
                    .into());
                }
            };

            debug!(?event, "runtime received event");
            step = self.core.step(event);
        }

        info!("runtime exiting");
        Ok(self.core.outcomes())
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await,
        }
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        debug!(?names, "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
