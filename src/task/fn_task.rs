// src/task/fn_task.rs

use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::artifact::{ArtifactPath, ContentType};
use crate::task::{InputDecl, OutputDecl, Task, TaskContext, TaskId};

type ApplyFn = dyn Fn(&mut TaskContext) -> Result<bool> + Send + Sync;

/// A task whose body is a closure.
///
/// ```
/// use buildgraph::task::{FnTask, InputDecl};
///
/// let compile = FnTask::new("compile:A", |ctx| {
///     let src = ctx.input_text(&"/src/A.txt".into())?.to_uppercase();
///     ctx.write(&"/build/A.ir".into(), src)?;
///     Ok(true)
/// })
/// .input(InputDecl::exact("/src/A.txt"))
/// .output("/build/A.ir", "ir");
/// ```
#[derive(Clone)]
pub struct FnTask {
    id: TaskId,
    inputs: Vec<InputDecl>,
    outputs: Vec<OutputDecl>,
    apply: Arc<ApplyFn>,
}

impl FnTask {
    pub fn new<F>(id: impl Into<TaskId>, apply: F) -> Self
    where
        F: Fn(&mut TaskContext) -> Result<bool> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            apply: Arc::new(apply),
        }
    }

    pub fn input(mut self, decl: InputDecl) -> Self {
        self.inputs.push(decl);
        self
    }

    pub fn output(
        mut self,
        path: impl Into<ArtifactPath>,
        content_type: impl Into<ContentType>,
    ) -> Self {
        self.outputs.push(OutputDecl::new(path, content_type));
        self
    }

    pub fn into_task(self) -> Arc<dyn Task> {
        Arc::new(self)
    }
}

impl fmt::Debug for FnTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask")
            .field("id", &self.id)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

impl Task for FnTask {
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
        (self.apply)(ctx)
    }
}
