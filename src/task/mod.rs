// src/task/mod.rs

//! Units of build work.
//!
//! - [`decl`] holds the structural input/output declarations.
//! - [`context`] is the sandbox a task runs in ([`TaskContext`]).
//! - [`fn_task`] and [`group`] are ready-made task types.

pub mod context;
pub mod decl;
pub mod fn_task;
pub mod group;

use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Result;

pub use context::TaskContext;
pub use decl::{InputDecl, InputMatcher, InputPattern, OutputDecl};
pub use fn_task::FnTask;
pub use group::TaskGroup;

/// Canonical task identifier; unique within one build.
pub type TaskId = String;

/// A unit of work that reads artifacts and produces new ones.
///
/// A task owns no state between invocations. Its declarations are consulted
/// once, when the build graph is constructed; `apply` is only ever handed
/// the inputs it declared and may only write the outputs it declared.
pub trait Task: Send + Sync + Debug {
    fn id(&self) -> TaskId;

    fn inputs(&self) -> Vec<InputDecl> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<OutputDecl> {
        Vec::new()
    }

    /// Do the work. `Ok(true)` is success; `Ok(false)` and `Err(_)` are both
    /// failures, and nothing staged in `ctx` is committed.
    fn apply(&self, ctx: &mut TaskContext) -> Result<bool>;

    /// Members of a composite task.
    fn subtasks(&self) -> Vec<Arc<dyn Task>> {
        Vec::new()
    }

    /// Composite tasks are expanded into their members and never run.
    fn is_composite(&self) -> bool {
        !self.subtasks().is_empty()
    }
}
