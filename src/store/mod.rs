// src/store/mod.rs

//! Content store contract.
//!
//! The engine only ever talks to a store through these traits, and always
//! receives it explicitly (`Arc<dyn ContentStore>`), never through a global.
//!
//! - [`StoreView`] is the read side: point lookups and prefix scans.
//! - [`ContentStore`] adds atomic batched writes, removal and snapshots.
//! - [`memory`] holds the in-memory reference implementation.
//! - [`typed`] layers content-type checks over any view.

pub mod memory;
pub mod typed;

use std::fmt::Debug;
use std::sync::Arc;

use thiserror::Error;

use crate::artifact::{Artifact, ArtifactPath, ContentType};

pub use memory::MemoryStore;
pub use typed::TypedView;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("the store root cannot hold an artifact")]
    RootPath,

    #[error("batch writes '{0}' more than once")]
    DuplicateInBatch(ArtifactPath),

    #[error("artifact '{path}' has content type '{found}', expected '{expected}'")]
    ContentTypeMismatch {
        path: ArtifactPath,
        expected: ContentType,
        found: ContentType,
    },

    #[error("store lock poisoned")]
    Poisoned,

    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read access to a store or to a frozen snapshot of one.
pub trait StoreView: Send + Sync + Debug {
    /// Artifact at exactly `path`, or `None` if there is none.
    fn get(&self, path: &ArtifactPath) -> StoreResult<Option<Arc<Artifact>>>;

    /// Every artifact at or beneath `prefix`, in path order.
    ///
    /// `get_all(&ArtifactPath::root())` lists the whole store.
    fn get_all(&self, prefix: &ArtifactPath) -> StoreResult<Vec<Arc<Artifact>>>;

    fn contains(&self, path: &ArtifactPath) -> StoreResult<bool> {
        Ok(self.get(path)?.is_some())
    }
}

/// A mutable store.
///
/// Implementations must guarantee:
/// - `put_all` is atomic: every artifact of the batch becomes visible, or
///   none does, and no reader ever observes part of a batch;
/// - write batches are serialized with respect to each other;
/// - a [`snapshot`](ContentStore::snapshot) never observes writes committed
///   after it was taken.
pub trait ContentStore: StoreView {
    /// Commit a batch. A batch naming the same path twice is rejected whole.
    fn put_all(&self, batch: Vec<Artifact>) -> StoreResult<()>;

    /// Remove the artifact at `path`, returning it if it existed.
    fn remove(&self, path: &ArtifactPath) -> StoreResult<Option<Arc<Artifact>>>;

    /// A consistent point-in-time view.
    fn snapshot(&self) -> StoreResult<Arc<dyn StoreView>>;

    fn put(&self, artifact: Artifact) -> StoreResult<()> {
        self.put_all(vec![artifact])
    }
}
