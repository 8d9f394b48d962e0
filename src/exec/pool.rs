// src/exec/pool.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error};

use crate::dag::ScheduledTask;
use crate::engine::{EngineEvent, ExecOutcome};
use crate::errors::Result;
use crate::store::ContentStore;

use super::backend::ExecutorBackend;
use super::runner::run_task;

/// Production executor backend.
///
/// Each dispatched task runs on Tokio's blocking thread pool, since task
/// bodies may do blocking work (e.g. invoke a compiler). A semaphore caps
/// the number running at once at `jobs`. Completions, including panics, are
/// reported back over the runtime's event channel.
pub struct WorkerPool {
    store: Arc<dyn ContentStore>,
    runtime_tx: mpsc::Sender<EngineEvent>,
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(
        store: Arc<dyn ContentStore>,
        runtime_tx: mpsc::Sender<EngineEvent>,
        jobs: usize,
    ) -> Self {
        Self {
            store,
            runtime_tx,
            permits: Arc::new(Semaphore::new(jobs.max(1))),
        }
    }
}

impl ExecutorBackend for WorkerPool {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        for task in tasks {
            let store = Arc::clone(&self.store);
            let tx = self.runtime_tx.clone();
            let permits = Arc::clone(&self.permits);

            tokio::spawn(async move {
                let id = task.id.clone();
                let outcome = execute(store, permits, task).await;
                if tx
                    .send(EngineEvent::TaskCompleted {
                        task: id.clone(),
                        outcome,
                    })
                    .await
                    .is_err()
                {
                    error!(task = %id, "runtime gone; dropping task completion");
                }
            });
        }

        Box::pin(async { Ok(()) })
    }
}

async fn execute(
    store: Arc<dyn ContentStore>,
    permits: Arc<Semaphore>,
    task: ScheduledTask,
) -> ExecOutcome {
    let _permit = match permits.acquire_owned().await {
        Ok(p) => p,
        Err(_) => return ExecOutcome::Failed("worker pool closed".to_string()),
    };

    let id = task.id.clone();
    debug!(task = %id, "worker picked up task");

    match tokio::task::spawn_blocking(move || run_task(store.as_ref(), &task.node)).await {
        Ok(outcome) => outcome,
        Err(join_err) => {
            error!(task = %id, error = %join_err, "task panicked");
            ExecOutcome::Failed(format!("task panicked: {join_err}"))
        }
    }
}
