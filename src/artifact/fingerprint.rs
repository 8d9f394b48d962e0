// src/artifact/fingerprint.rs

//! Content fingerprints used for staleness checks.
//!
//! Fingerprints are blake3 digests. An artifact's fingerprint covers its
//! content type and payload; a task's input fingerprint covers the task id
//! plus every resolved input (path, artifact fingerprint and, for derived
//! artifacts, the derivation they were built from) in path order.

use std::fmt;

use blake3::Hasher;

use crate::artifact::{Artifact, ArtifactPath, ContentType};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    /// Abbreviated form for log lines.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl From<blake3::Hash> for Fingerprint {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

/// Fingerprint of a single artifact's content.
pub fn content_fingerprint(content_type: &ContentType, payload: &[u8]) -> Fingerprint {
    let mut hasher = Hasher::new();
    update_framed(&mut hasher, content_type.as_str().as_bytes());
    update_framed(&mut hasher, payload);
    hasher.finalize().into()
}

/// Aggregate fingerprint of the inputs a task run consumed.
///
/// `inputs` must already be sorted by path; callers pass the resolved input
/// map, which is a `BTreeMap` and so iterates in path order.
pub fn input_fingerprint<'a, I>(task: &str, inputs: I) -> Fingerprint
where
    I: IntoIterator<Item = (&'a ArtifactPath, &'a Artifact)>,
{
    let mut hasher = Hasher::new();
    update_framed(&mut hasher, task.as_bytes());
    for (path, artifact) in inputs {
        update_framed(&mut hasher, path.to_string().as_bytes());
        hasher.update(artifact.fingerprint().as_bytes());
        // Chains the upstream derivation in, so re-deriving an input with
        // identical bytes still invalidates its consumers.
        match artifact.derivation() {
            Some(derivation) => {
                hasher.update(&[1]);
                hasher.update(derivation.as_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
    }
    hasher.finalize().into()
}

// Length-prefix every variable-sized field so distinct inputs never collide
// by concatenation.
fn update_framed(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
