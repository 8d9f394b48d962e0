// src/exec/runner.rs

//! Individual task runner.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, error, info, warn};

use crate::artifact::fingerprint::input_fingerprint;
use crate::artifact::{Artifact, ArtifactPath, ContentType, Fingerprint};
use crate::dag::TaskNode;
use crate::engine::ExecOutcome;
use crate::store::{ContentStore, StoreView, TypedView};
use crate::task::TaskContext;

/// Run a single task to completion against `store`.
///
/// 1. Take one snapshot and resolve every declared input from it.
/// 2. If every declared output was already derived from exactly these
///    inputs, report `Fresh` without running anything.
/// 3. Otherwise call `apply`; on success commit all outputs in one batch.
///
/// Any error along the way is a task failure, never a panic, and leaves the
/// store untouched.
pub fn run_task(store: &dyn ContentStore, node: &TaskNode) -> ExecOutcome {
    match run_task_inner(store, node) {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(task = %node.id, error = %format!("{err:#}"), "task execution error");
            ExecOutcome::Failed(format!("{err:#}"))
        }
    }
}

fn run_task_inner(store: &dyn ContentStore, node: &TaskNode) -> Result<ExecOutcome> {
    let snapshot = store.snapshot().context("taking store snapshot")?;
    let inputs = resolve_inputs(snapshot.as_ref(), node)?;
    let fingerprint = input_fingerprint(&node.id, inputs.iter().map(|(p, a)| (p, &**a)));

    if is_fresh(snapshot.as_ref(), node, fingerprint)? {
        info!(task = %node.id, fingerprint = %fingerprint.short(), "outputs up to date; skipping");
        return Ok(ExecOutcome::Fresh);
    }
    drop(snapshot);

    info!(
        task = %node.id,
        inputs = inputs.len(),
        fingerprint = %fingerprint.short(),
        "running task"
    );

    let outputs: BTreeMap<ArtifactPath, ContentType> = node
        .outputs
        .iter()
        .map(|o| (o.path.clone(), o.content_type.clone()))
        .collect();
    let mut ctx = TaskContext::new(node.id.clone(), inputs, outputs);

    match node.task.apply(&mut ctx) {
        Ok(true) => {}
        Ok(false) => {
            warn!(task = %node.id, "task reported failure");
            return Ok(ExecOutcome::Failed("task reported failure".to_string()));
        }
        Err(err) => {
            warn!(task = %node.id, error = %format!("{err:#}"), "task returned an error");
            return Ok(ExecOutcome::Failed(format!("{err:#}")));
        }
    }

    let batch = ctx.into_batch(fingerprint)?;
    commit(store, node, batch)?;

    Ok(ExecOutcome::Succeeded)
}

/// Resolve declared inputs against one snapshot, in path order.
fn resolve_inputs(
    snapshot: &dyn StoreView,
    node: &TaskNode,
) -> Result<BTreeMap<ArtifactPath, Arc<Artifact>>> {
    let typed = TypedView::new(snapshot);
    let mut resolved = BTreeMap::new();

    for input in &node.inputs {
        if let Some(path) = input.exact() {
            let artifact = match input.content_type() {
                Some(ct) => typed.get(path, ct)?,
                None => snapshot.get(path)?,
            };
            let Some(artifact) = artifact else {
                bail!("input '{}' is missing from the store", path);
            };
            resolved.insert(path.clone(), artifact);
            continue;
        }

        let candidates = match input.content_type() {
            Some(ct) => typed.get_all_of(input.scan_root(), ct)?,
            None => snapshot.get_all(input.scan_root())?,
        };
        for artifact in candidates {
            if input.matches(artifact.path()) {
                resolved.insert(artifact.path().clone(), artifact);
            }
        }
    }

    debug!(task = %node.id, count = resolved.len(), "resolved inputs");
    Ok(resolved)
}

/// A task is fresh when it declares outputs and every one of them exists,
/// has the declared type, and was derived from `fingerprint`.
fn is_fresh(snapshot: &dyn StoreView, node: &TaskNode, fingerprint: Fingerprint) -> Result<bool> {
    if node.outputs.is_empty() {
        return Ok(false);
    }

    for output in &node.outputs {
        let Some(existing) = snapshot.get(&output.path)? else {
            debug!(task = %node.id, path = %output.path, "output missing; task is stale");
            return Ok(false);
        };
        if existing.content_type() != &output.content_type
            || existing.derivation() != Some(fingerprint)
        {
            debug!(task = %node.id, path = %output.path, "output derived from other inputs; task is stale");
            return Ok(false);
        }
    }

    Ok(true)
}

fn commit(store: &dyn ContentStore, node: &TaskNode, batch: Vec<Artifact>) -> Result<()> {
    let paths: Vec<String> = batch.iter().map(|a| a.path().to_string()).collect();
    store
        .put_all(batch)
        .with_context(|| format!("committing outputs of task '{}'", node.id))?;
    info!(task = %node.id, outputs = ?paths, "committed outputs");
    Ok(())
}
