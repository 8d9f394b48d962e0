pub mod builders;
pub mod failing_store;
pub mod fake_executor;

use std::sync::{Arc, Once};

use buildgraph::artifact::Artifact;
use buildgraph::store::{ContentStore, MemoryStore};
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// A `text` source artifact.
pub fn text_source(path: &str, text: &str) -> Artifact {
    Artifact::source(path.into(), "text".into(), text.as_bytes().to_vec())
        .expect("valid source artifact")
}

/// A memory store pre-populated with `text` sources.
pub fn seeded_store(sources: &[(&str, &str)]) -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    let batch = sources
        .iter()
        .map(|(path, text)| text_source(path, text))
        .collect();
    store.put_all(batch).expect("seed store");
    Arc::new(store)
}

/// Overwrite (or create) a `text` source in `store`.
pub fn set_source(store: &dyn ContentStore, path: &str, text: &str) {
    store.put(text_source(path, text)).expect("update source");
}

/// The payload at `path` as text, if present.
pub fn read_text(store: &dyn ContentStore, path: &str) -> Option<String> {
    store
        .get(&path.into())
        .expect("store read")
        .map(|a| String::from_utf8_lossy(a.payload()).into_owned())
}
