// src/store/typed.rs

//! Optional content-type checking on top of the plain path → artifact view.

use std::sync::Arc;

use crate::artifact::{Artifact, ArtifactPath, ContentType};

use super::{StoreError, StoreResult, StoreView};

/// Wraps a [`StoreView`] and rejects artifacts of an unexpected type.
#[derive(Debug, Clone, Copy)]
pub struct TypedView<'a> {
    inner: &'a dyn StoreView,
}

impl<'a> TypedView<'a> {
    pub fn new(inner: &'a dyn StoreView) -> Self {
        Self { inner }
    }

    /// Artifact at `path`, checked against `expected`.
    pub fn get(
        &self,
        path: &ArtifactPath,
        expected: &ContentType,
    ) -> StoreResult<Option<Arc<Artifact>>> {
        match self.inner.get(path)? {
            Some(artifact) => {
                check(&artifact, expected)?;
                Ok(Some(artifact))
            }
            None => Ok(None),
        }
    }

    /// Artifacts at or beneath `prefix`, keeping only those of type `wanted`.
    pub fn get_all_of(
        &self,
        prefix: &ArtifactPath,
        wanted: &ContentType,
    ) -> StoreResult<Vec<Arc<Artifact>>> {
        Ok(self
            .inner
            .get_all(prefix)?
            .into_iter()
            .filter(|a| a.content_type() == wanted)
            .collect())
    }
}

pub fn check(artifact: &Artifact, expected: &ContentType) -> StoreResult<()> {
    if artifact.content_type() != expected {
        return Err(StoreError::ContentTypeMismatch {
            path: artifact.path().clone(),
            expected: expected.clone(),
            found: artifact.content_type().clone(),
        });
    }
    Ok(())
}
