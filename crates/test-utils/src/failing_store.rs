use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use buildgraph::artifact::{Artifact, ArtifactPath};
use buildgraph::store::{ContentStore, MemoryStore, StoreError, StoreResult, StoreView};

/// A store whose backend rejects any batch touching a chosen path.
///
/// Reads, removals and snapshots go straight to the wrapped [`MemoryStore`].
/// A rejected batch is never forwarded, the way a backend that crashed before
/// its commit point would leave things.
#[derive(Debug)]
pub struct FailingStore {
    inner: Arc<MemoryStore>,
    poisoned: ArtifactPath,
    rejected: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: Arc<MemoryStore>, poisoned: &str) -> Self {
        Self {
            inner,
            poisoned: poisoned.into(),
            rejected: AtomicUsize::new(0),
        }
    }

    /// Number of batches rejected so far.
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }
}

impl StoreView for FailingStore {
    fn get(&self, path: &ArtifactPath) -> StoreResult<Option<Arc<Artifact>>> {
        self.inner.get(path)
    }

    fn get_all(&self, prefix: &ArtifactPath) -> StoreResult<Vec<Arc<Artifact>>> {
        self.inner.get_all(prefix)
    }
}

impl ContentStore for FailingStore {
    fn put_all(&self, batch: Vec<Artifact>) -> StoreResult<()> {
        if batch.iter().any(|a| a.path() == &self.poisoned) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Backend(format!(
                "simulated crash writing '{}'",
                self.poisoned
            )));
        }
        self.inner.put_all(batch)
    }

    fn remove(&self, path: &ArtifactPath) -> StoreResult<Option<Arc<Artifact>>> {
        self.inner.remove(path)
    }

    fn snapshot(&self) -> StoreResult<Arc<dyn StoreView>> {
        self.inner.snapshot()
    }
}
