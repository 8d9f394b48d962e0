// src/artifact/mod.rs

//! Artifact content model.
//!
//! - [`path`] holds the hierarchical [`ArtifactPath`] key.
//! - [`content`] holds the [`ContentType`] tag.
//! - [`fingerprint`] computes content and input digests.
//!
//! An [`Artifact`] is immutable once built. Derived artifacts point at the
//! exact input artifacts they were produced from via `Arc` references taken
//! from a store snapshot, so provenance can only ever reference artifacts
//! that existed before, and cannot form a cycle.

pub mod content;
pub mod fingerprint;
pub mod path;

use std::fmt;
use std::sync::Arc;

pub use content::ContentType;
pub use fingerprint::Fingerprint;
pub use path::{ArtifactPath, PathError};

use crate::store::StoreError;

#[derive(Clone)]
pub struct Artifact {
    path: ArtifactPath,
    content_type: ContentType,
    payload: Arc<[u8]>,
    source_artifacts: Vec<Arc<Artifact>>,
    derivation: Option<Fingerprint>,
    fingerprint: Fingerprint,
}

impl Artifact {
    /// A root source artifact (no producers).
    pub fn source(
        path: ArtifactPath,
        content_type: ContentType,
        payload: impl Into<Vec<u8>>,
    ) -> Result<Self, StoreError> {
        Self::build(path, content_type, payload.into(), Vec::new(), None)
    }

    /// An artifact produced by a task run.
    ///
    /// `source_artifacts` are the inputs the run consumed, in path order;
    /// `derivation` is the input fingerprint of that run.
    pub fn derived(
        path: ArtifactPath,
        content_type: ContentType,
        payload: impl Into<Vec<u8>>,
        source_artifacts: Vec<Arc<Artifact>>,
        derivation: Fingerprint,
    ) -> Result<Self, StoreError> {
        Self::build(
            path,
            content_type,
            payload.into(),
            source_artifacts,
            Some(derivation),
        )
    }

    fn build(
        path: ArtifactPath,
        content_type: ContentType,
        payload: Vec<u8>,
        source_artifacts: Vec<Arc<Artifact>>,
        derivation: Option<Fingerprint>,
    ) -> Result<Self, StoreError> {
        if path.is_root() {
            return Err(StoreError::RootPath);
        }
        let fingerprint = fingerprint::content_fingerprint(&content_type, &payload);
        Ok(Self {
            path,
            content_type,
            payload: Arc::from(payload),
            source_artifacts,
            derivation,
            fingerprint,
        })
    }

    pub fn path(&self) -> &ArtifactPath {
        &self.path
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload as UTF-8, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Artifacts this one was produced from. Empty for source artifacts.
    pub fn source_artifacts(&self) -> &[Arc<Artifact>] {
        &self.source_artifacts
    }

    /// Input fingerprint of the task run that produced this artifact.
    pub fn derivation(&self) -> Option<Fingerprint> {
        self.derivation
    }

    /// Fingerprint of this artifact's content type and payload.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn is_source(&self) -> bool {
        self.source_artifacts.is_empty() && self.derivation.is_none()
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<&ArtifactPath> = self.source_artifacts.iter().map(|a| a.path()).collect();
        f.debug_struct("Artifact")
            .field("path", &self.path)
            .field("content_type", &self.content_type)
            .field("len", &self.payload.len())
            .field("fingerprint", &self.fingerprint)
            .field("derivation", &self.derivation)
            .field("sources", &sources)
            .finish()
    }
}
