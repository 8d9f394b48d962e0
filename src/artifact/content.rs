// src/artifact/content.rs

use std::fmt;
use std::sync::Arc;

/// Semantic kind of an artifact (e.g. `text/whiley`, `whiley/ir`).
///
/// Distinct from the storage format; tasks use it to check that what they
/// read and write is what they declared.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentType(Arc<str>);

impl ContentType {
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(Arc::from(tag.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
