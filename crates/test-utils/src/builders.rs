#![allow(dead_code)]

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use buildgraph::artifact::ArtifactPath;
use buildgraph::task::{InputDecl, OutputDecl, Task, TaskContext, TaskId};

/// Shared, ordered record of `start:<id>` / `end:<id>` entries.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// What a [`StubTask`] does when applied.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Write every declared output: `<id>(<path>=<payload>,...)` over the
    /// inputs in path order. Deterministic for identical inputs.
    Transform,
    /// Write every declared output as `<id>(len=<n>)`, where `n` is the
    /// total input payload size. Distinct inputs can yield the same bytes.
    Measure,
    /// Return `Ok(false)`.
    Fail,
    /// Return `Err(msg)`.
    Error(String),
    Panic,
    /// Write only the first declared output, then succeed.
    Partial,
    /// Write a path that was never declared, then succeed.
    WriteUndeclared(ArtifactPath),
}

/// Builder for a task with fixed declarations and scripted behaviour.
///
/// ```ignore
/// let compile = StubTask::new("compile")
///     .reads("/src/a.txt")
///     .writes("/build/a.ir", "ir");
/// let calls = compile.calls();
/// let task = compile.into_task();
/// ```
#[derive(Clone)]
pub struct StubTask {
    id: TaskId,
    inputs: Vec<InputDecl>,
    outputs: Vec<OutputDecl>,
    behaviour: Behaviour,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    log: Option<EventLog>,
}

impl StubTask {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            behaviour: Behaviour::Transform,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            log: None,
        }
    }

    pub fn reads(mut self, path: &str) -> Self {
        self.inputs.push(InputDecl::exact(path));
        self
    }

    pub fn reads_prefix(mut self, path: &str) -> Self {
        self.inputs.push(InputDecl::prefix(path));
        self
    }

    pub fn reads_glob(mut self, pattern: &str) -> Self {
        self.inputs.push(InputDecl::glob(pattern));
        self
    }

    pub fn input(mut self, decl: InputDecl) -> Self {
        self.inputs.push(decl);
        self
    }

    pub fn writes(mut self, path: &str, content_type: &str) -> Self {
        self.outputs.push(OutputDecl::new(path, content_type));
        self
    }

    pub fn behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn fails(self) -> Self {
        self.behaviour(Behaviour::Fail)
    }

    pub fn errors(self, msg: &str) -> Self {
        self.behaviour(Behaviour::Error(msg.to_string()))
    }

    pub fn panics(self) -> Self {
        self.behaviour(Behaviour::Panic)
    }

    /// Sleep this long inside `apply` (on the blocking worker thread).
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn log_to(mut self, log: &EventLog) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    /// Counter of `apply` invocations, shared with every clone.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn into_task(self) -> Arc<dyn Task> {
        Arc::new(self)
    }

    fn record(&self, event: &str) {
        if let Some(log) = &self.log {
            log.lock().unwrap().push(format!("{event}:{}", self.id));
        }
    }

    fn transform(&self, ctx: &TaskContext) -> String {
        let parts: Vec<String> = ctx
            .inputs()
            .map(|a| format!("{}={}", a.path(), String::from_utf8_lossy(a.payload())))
            .collect();
        format!("{}({})", self.id, parts.join(","))
    }

    fn run(&self, ctx: &mut TaskContext) -> Result<bool> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        match &self.behaviour {
            Behaviour::Transform => {
                let payload = self.transform(ctx);
                for output in &self.outputs {
                    ctx.write(&output.path, payload.clone())?;
                }
                Ok(true)
            }
            Behaviour::Measure => {
                let len: usize = ctx.inputs().map(|a| a.payload().len()).sum();
                let payload = format!("{}(len={len})", self.id);
                for output in &self.outputs {
                    ctx.write(&output.path, payload.clone())?;
                }
                Ok(true)
            }
            Behaviour::Fail => Ok(false),
            Behaviour::Error(msg) => Err(anyhow!("{msg}")),
            Behaviour::Panic => panic!("stub task '{}' panicked", self.id),
            Behaviour::Partial => {
                let payload = self.transform(ctx);
                if let Some(first) = self.outputs.first() {
                    ctx.write(&first.path, payload)?;
                }
                Ok(true)
            }
            Behaviour::WriteUndeclared(path) => {
                let payload = self.transform(ctx);
                for output in &self.outputs {
                    ctx.write(&output.path, payload.clone())?;
                }
                let _ = ctx.write(path, payload);
                Ok(true)
            }
        }
    }
}

impl fmt::Debug for StubTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubTask")
            .field("id", &self.id)
            .field("behaviour", &self.behaviour)
            .finish()
    }
}

impl Task for StubTask {
    fn id(&self) -> TaskId {
        self.id.clone()
    }

    fn inputs(&self) -> Vec<InputDecl> {
        self.inputs.clone()
    }

    fn outputs(&self) -> Vec<OutputDecl> {
        self.outputs.clone()
    }

    fn apply(&self, ctx: &mut TaskContext) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.record("start");
        let result = self.run(ctx);
        self.record("end");
        result
    }
}
