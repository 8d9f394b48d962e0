// src/lib.rs

//! Incremental build-graph engine.
//!
//! Tasks declare the artifact paths they read and write. The engine derives
//! the dependency graph from those declarations, skips tasks whose outputs
//! were already derived from the current inputs, runs the rest in parallel
//! in dependency order, and commits each task's outputs to a content store
//! atomically.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use buildgraph::{Build, BuildOptions, ContentStore, FnTask, InputDecl, MemoryStore};
//! use buildgraph::artifact::{Artifact, ArtifactPath};
//!
//! # async fn demo() -> buildgraph::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! store.put(Artifact::source("/src/a.txt".into(), "text".into(), b"foo".to_vec())?)?;
//!
//! let upper = FnTask::new("upper", |ctx| {
//!     let text = ctx.input_text(&"/src/a.txt".into())?.to_uppercase();
//!     ctx.write(&"/build/a.txt".into(), text)?;
//!     Ok(true)
//! })
//! .input(InputDecl::exact("/src/a.txt"))
//! .output("/build/a.txt", "text");
//!
//! let report = Build::new(store, BuildOptions::default())
//!     .task(upper.into_task())
//!     .run()
//!     .await?;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod build;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod platform;
pub mod report;
pub mod store;
pub mod task;
pub mod types;

pub use artifact::{Artifact, ArtifactPath, ContentType, Fingerprint};
pub use build::Build;
pub use config::BuildOptions;
pub use errors::{BuildError, Result};
pub use platform::{BuildContext, Platform};
pub use report::{BuildReport, TaskOutcome};
pub use store::{ContentStore, MemoryStore, StoreError, StoreView};
pub use task::{FnTask, InputDecl, OutputDecl, Task, TaskContext, TaskGroup, TaskId};
pub use types::{FailureMode, LogLevel};
