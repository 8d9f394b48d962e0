use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use buildgraph::dag::ScheduledTask;
use buildgraph::engine::{EngineEvent, ExecOutcome};
use buildgraph::errors::Result;
use buildgraph::exec::ExecutorBackend;
use buildgraph::task::TaskId;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were dispatched, in order
/// - immediately reports a scripted outcome for each (default: `Succeeded`)
///
/// It never runs task bodies or touches a store.
pub struct ScriptedExecutor {
    runtime_tx: mpsc::Sender<EngineEvent>,
    script: BTreeMap<TaskId, ExecOutcome>,
    dispatched: Arc<Mutex<Vec<String>>>,
}

impl ScriptedExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<EngineEvent>,
        dispatched: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            script: BTreeMap::new(),
            dispatched,
        }
    }

    pub fn with_outcome(mut self, task: &str, outcome: ExecOutcome) -> Self {
        self.script.insert(task.to_string(), outcome);
        self
    }

    pub fn failing(self, task: &str) -> Self {
        self.with_outcome(task, ExecOutcome::Failed(format!("{task} failed")))
    }
}

impl ExecutorBackend for ScriptedExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let dispatched = Arc::clone(&self.dispatched);
        let script = &self.script;

        Box::pin(async move {
            for t in tasks {
                {
                    let mut guard = dispatched.lock().unwrap();
                    guard.push(t.id.clone());
                }

                let outcome = script
                    .get(&t.id)
                    .cloned()
                    .unwrap_or(ExecOutcome::Succeeded);

                tx.send(EngineEvent::TaskCompleted {
                    task: t.id.clone(),
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
