// src/artifact/path.rs

//! Hierarchical artifact keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator used by the canonical string form.
pub const SEPARATOR: char = '/';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path component must not be empty")]
    EmptyComponent,

    #[error("path component '{0}' must not contain '/'")]
    SeparatorInComponent(String),
}

/// Location of an artifact within a store.
///
/// A path is an ordered sequence of components. Ordering is lexicographic,
/// component by component, so every descendant of a path sorts directly after
/// it; stores rely on that for prefix scans.
///
/// The empty path is the store root. It is valid for whole-store queries
/// (e.g. `get_all(&ArtifactPath::root())`) but never names an artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactPath {
    components: Vec<String>,
}

impl ArtifactPath {
    /// The store root (no components).
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from its components.
    pub fn new<I, S>(components: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let components = components
            .into_iter()
            .map(Into::into)
            .collect::<Vec<String>>();

        for c in &components {
            validate_component(c)?;
        }

        Ok(Self { components })
    }

    /// Parse the canonical form (`/src/main.whiley`). Repeated or trailing
    /// separators are ignored, so `"/"` and `""` both yield the root.
    pub fn parse(s: &str) -> Self {
        Self {
            components: s
                .split(SEPARATOR)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Last component, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// Parent path, or `None` for the root.
    pub fn parent(&self) -> Option<ArtifactPath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }

    /// Append a single component.
    pub fn join(&self, component: impl Into<String>) -> Result<ArtifactPath, PathError> {
        let component = component.into();
        validate_component(&component)?;
        let mut components = self.components.clone();
        components.push(component);
        Ok(Self { components })
    }

    /// Non-strict prefix test: `self` equals `prefix` or lies beneath it.
    pub fn starts_with(&self, prefix: &ArtifactPath) -> bool {
        self.components.starts_with(&prefix.components)
    }

    /// Strict: `self` is a proper prefix of `other`.
    pub fn is_ancestor_of(&self, other: &ArtifactPath) -> bool {
        self.components.len() < other.components.len() && other.starts_with(self)
    }

    /// Strict: `other` is a proper prefix of `self`.
    pub fn is_descendant_of(&self, other: &ArtifactPath) -> bool {
        other.is_ancestor_of(self)
    }
}

fn validate_component(c: &str) -> Result<(), PathError> {
    if c.is_empty() {
        return Err(PathError::EmptyComponent);
    }
    if c.contains(SEPARATOR) {
        return Err(PathError::SeparatorInComponent(c.to_string()));
    }
    Ok(())
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "{SEPARATOR}");
        }
        for c in &self.components {
            write!(f, "{SEPARATOR}{c}")?;
        }
        Ok(())
    }
}

impl FromStr for ArtifactPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for ArtifactPath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl TryFrom<String> for ArtifactPath {
    type Error = PathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Ok(Self::parse(&s))
    }
}

impl From<ArtifactPath> for String {
    fn from(path: ArtifactPath) -> Self {
        path.to_string()
    }
}
