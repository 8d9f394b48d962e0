// src/store/memory.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

use crate::artifact::{Artifact, ArtifactPath};

use super::{ContentStore, StoreError, StoreResult, StoreView};

type Entries = BTreeMap<ArtifactPath, Arc<Artifact>>;

/// In-memory store.
///
/// The map lives behind an `Arc` that writers replace copy-on-write, so a
/// snapshot is just a clone of the current `Arc` and can never see a later
/// batch. Writers are serialized by the `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<Arc<Entries>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the given artifacts.
    pub fn with_artifacts(artifacts: impl IntoIterator<Item = Artifact>) -> StoreResult<Self> {
        let store = Self::new();
        store.put_all(artifacts.into_iter().collect())?;
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.current().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn current(&self) -> StoreResult<Arc<Entries>> {
        let guard = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(Arc::clone(&guard))
    }
}

impl StoreView for MemoryStore {
    fn get(&self, path: &ArtifactPath) -> StoreResult<Option<Arc<Artifact>>> {
        Ok(self.current()?.get(path).cloned())
    }

    fn get_all(&self, prefix: &ArtifactPath) -> StoreResult<Vec<Arc<Artifact>>> {
        let entries = self.current()?;
        Ok(scan_prefix(&entries, prefix))
    }
}

impl ContentStore for MemoryStore {
    fn put_all(&self, batch: Vec<Artifact>) -> StoreResult<()> {
        // Validate the whole batch before touching the map.
        let mut seen = BTreeSet::new();
        for artifact in &batch {
            if artifact.path().is_root() {
                return Err(StoreError::RootPath);
            }
            if !seen.insert(artifact.path().clone()) {
                return Err(StoreError::DuplicateInBatch(artifact.path().clone()));
            }
        }

        let mut guard = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        let mut next: Entries = (**guard).clone();
        for artifact in batch {
            trace!(path = %artifact.path(), "staging artifact");
            next.insert(artifact.path().clone(), Arc::new(artifact));
        }
        *guard = Arc::new(next);

        debug!(count = seen.len(), "committed batch");
        Ok(())
    }

    fn remove(&self, path: &ArtifactPath) -> StoreResult<Option<Arc<Artifact>>> {
        let mut guard = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        if !guard.contains_key(path) {
            return Ok(None);
        }
        let mut next: Entries = (**guard).clone();
        let removed = next.remove(path);
        *guard = Arc::new(next);
        debug!(path = %path, "removed artifact");
        Ok(removed)
    }

    fn snapshot(&self) -> StoreResult<Arc<dyn StoreView>> {
        Ok(Arc::new(Snapshot {
            entries: self.current()?,
        }))
    }
}

/// Frozen view handed out by [`MemoryStore::snapshot`].
#[derive(Debug)]
struct Snapshot {
    entries: Arc<Entries>,
}

impl StoreView for Snapshot {
    fn get(&self, path: &ArtifactPath) -> StoreResult<Option<Arc<Artifact>>> {
        Ok(self.entries.get(path).cloned())
    }

    fn get_all(&self, prefix: &ArtifactPath) -> StoreResult<Vec<Arc<Artifact>>> {
        Ok(scan_prefix(&self.entries, prefix))
    }
}

// Descendants of a path sort contiguously right after it.
fn scan_prefix(entries: &Entries, prefix: &ArtifactPath) -> Vec<Arc<Artifact>> {
    entries
        .range(prefix.clone()..)
        .take_while(|(path, _)| path.starts_with(prefix))
        .map(|(_, artifact)| Arc::clone(artifact))
        .collect()
}
