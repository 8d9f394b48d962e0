// src/task/context.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};

use crate::artifact::{Artifact, ArtifactPath, ContentType, Fingerprint};
use crate::task::TaskId;

/// Everything a task may touch while it runs.
///
/// Inputs were resolved from a single store snapshot before `apply` was
/// called, so a task always sees a consistent set. Writes are staged here
/// and only reach the store, as one batch, if the task succeeds.
#[derive(Debug)]
pub struct TaskContext {
    task: TaskId,
    inputs: BTreeMap<ArtifactPath, Arc<Artifact>>,
    outputs: BTreeMap<ArtifactPath, ContentType>,
    staged: BTreeMap<ArtifactPath, Vec<u8>>,
    violations: Vec<String>,
}

impl TaskContext {
    pub(crate) fn new(
        task: TaskId,
        inputs: BTreeMap<ArtifactPath, Arc<Artifact>>,
        outputs: BTreeMap<ArtifactPath, ContentType>,
    ) -> Self {
        Self {
            task,
            inputs,
            outputs,
            staged: BTreeMap::new(),
            violations: Vec::new(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task
    }

    /// A resolved input. Only declared inputs are visible.
    pub fn input(&self, path: &ArtifactPath) -> Result<&Arc<Artifact>> {
        self.inputs
            .get(path)
            .ok_or_else(|| anyhow!("task '{}' did not declare input '{}'", self.task, path))
    }

    /// A resolved input's payload as UTF-8.
    pub fn input_text(&self, path: &ArtifactPath) -> Result<&str> {
        let artifact = self.input(path)?;
        artifact
            .text()
            .ok_or_else(|| anyhow!("input '{}' is not valid UTF-8", path))
    }

    /// All resolved inputs, in path order.
    pub fn inputs(&self) -> impl Iterator<Item = &Arc<Artifact>> {
        self.inputs.values()
    }

    /// Resolved inputs at or beneath `prefix`, in path order.
    pub fn inputs_under<'a>(
        &'a self,
        prefix: &'a ArtifactPath,
    ) -> impl Iterator<Item = &'a Arc<Artifact>> + 'a {
        self.inputs
            .range(prefix.clone()..)
            .take_while(move |(path, _)| path.starts_with(prefix))
            .map(|(_, artifact)| artifact)
    }

    /// Declared outputs and their content types.
    pub fn outputs(&self) -> impl Iterator<Item = (&ArtifactPath, &ContentType)> {
        self.outputs.iter()
    }

    /// Stage the payload of a declared output. Writing the same output twice
    /// keeps the last payload.
    pub fn write(&mut self, path: &ArtifactPath, payload: impl Into<Vec<u8>>) -> Result<()> {
        if !self.outputs.contains_key(path) {
            let msg = format!("task '{}' wrote undeclared output '{}'", self.task, path);
            self.violations.push(msg.clone());
            bail!(msg);
        }
        self.staged.insert(path.clone(), payload.into());
        Ok(())
    }

    /// Turn the staged writes into the artifacts to commit.
    ///
    /// Fails if the task tried to write outside its declaration or left a
    /// declared output unwritten; in both cases nothing is committed.
    pub(crate) fn into_batch(self, derivation: Fingerprint) -> Result<Vec<Artifact>> {
        if let Some(first) = self.violations.first() {
            bail!("{first}");
        }

        let sources: Vec<Arc<Artifact>> = self.inputs.values().cloned().collect();
        let mut staged = self.staged;
        let mut batch = Vec::with_capacity(self.outputs.len());

        for (path, content_type) in self.outputs {
            let payload = staged.remove(&path).ok_or_else(|| {
                anyhow!("task '{}' did not produce declared output '{}'", self.task, path)
            })?;
            batch.push(Artifact::derived(
                path,
                content_type,
                payload,
                sources.clone(),
                derivation,
            )?);
        }

        Ok(batch)
    }
}
