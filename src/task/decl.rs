// src/task/decl.rs

//! Structural input/output declarations.
//!
//! Declarations are read once, when the build graph is constructed. They must
//! not depend on artifact content: the dependency graph is derived from them
//! before anything runs.

use std::fmt;

use globset::{GlobBuilder, GlobMatcher};

use crate::artifact::{ArtifactPath, ContentType};

/// What a task reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPattern {
    /// Exactly one artifact, which must exist or be produced by a task.
    Exact(ArtifactPath),
    /// Every artifact at or beneath a path.
    Prefix(ArtifactPath),
    /// Every artifact whose canonical path matches a glob
    /// (`/src/**/*.whiley`). `*` does not cross `/`; `**` does.
    Glob(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDecl {
    pub pattern: InputPattern,
    /// When set, resolved inputs must carry this content type.
    pub content_type: Option<ContentType>,
}

impl InputDecl {
    pub fn exact(path: impl Into<ArtifactPath>) -> Self {
        Self {
            pattern: InputPattern::Exact(path.into()),
            content_type: None,
        }
    }

    pub fn prefix(path: impl Into<ArtifactPath>) -> Self {
        Self {
            pattern: InputPattern::Prefix(path.into()),
            content_type: None,
        }
    }

    pub fn glob(pattern: impl Into<String>) -> Self {
        Self {
            pattern: InputPattern::Glob(pattern.into()),
            content_type: None,
        }
    }

    pub fn typed(mut self, content_type: impl Into<ContentType>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub(crate) fn compile(&self) -> Result<InputMatcher, globset::Error> {
        let kind = match &self.pattern {
            InputPattern::Exact(p) => MatcherKind::Exact(p.clone()),
            InputPattern::Prefix(p) => MatcherKind::Prefix(p.clone()),
            InputPattern::Glob(g) => {
                let matcher = GlobBuilder::new(g)
                    .literal_separator(true)
                    .build()?
                    .compile_matcher();
                MatcherKind::Glob {
                    base: literal_base(g),
                    matcher,
                    source: g.clone(),
                }
            }
        };
        Ok(InputMatcher {
            kind,
            content_type: self.content_type.clone(),
        })
    }
}

impl fmt::Display for InputDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pattern {
            InputPattern::Exact(p) => write!(f, "{p}"),
            InputPattern::Prefix(p) => write!(f, "{p}/..."),
            InputPattern::Glob(g) => write!(f, "{g}"),
        }
    }
}

/// What a task writes: one path of one content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDecl {
    pub path: ArtifactPath,
    pub content_type: ContentType,
}

impl OutputDecl {
    pub fn new(path: impl Into<ArtifactPath>, content_type: impl Into<ContentType>) -> Self {
        Self {
            path: path.into(),
            content_type: content_type.into(),
        }
    }
}

/// Compiled form of an [`InputDecl`], captured in the build graph.
#[derive(Debug, Clone)]
pub struct InputMatcher {
    kind: MatcherKind,
    content_type: Option<ContentType>,
}

#[derive(Debug, Clone)]
enum MatcherKind {
    Exact(ArtifactPath),
    Prefix(ArtifactPath),
    Glob {
        base: ArtifactPath,
        matcher: GlobMatcher,
        source: String,
    },
}

impl InputMatcher {
    /// The single path this matcher names, if it is an exact input.
    pub fn exact(&self) -> Option<&ArtifactPath> {
        match &self.kind {
            MatcherKind::Exact(p) => Some(p),
            _ => None,
        }
    }

    /// Smallest subtree that can contain every match.
    pub fn scan_root(&self) -> &ArtifactPath {
        match &self.kind {
            MatcherKind::Exact(p) | MatcherKind::Prefix(p) => p,
            MatcherKind::Glob { base, .. } => base,
        }
    }

    pub fn matches(&self, path: &ArtifactPath) -> bool {
        match &self.kind {
            MatcherKind::Exact(p) => p == path,
            MatcherKind::Prefix(p) => path.starts_with(p),
            MatcherKind::Glob { base, matcher, .. } => {
                path.starts_with(base) && matcher.is_match(path.to_string())
            }
        }
    }

    pub fn content_type(&self) -> Option<&ContentType> {
        self.content_type.as_ref()
    }
}

impl fmt::Display for InputMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MatcherKind::Exact(p) => write!(f, "{p}"),
            MatcherKind::Prefix(p) => write!(f, "{p}/..."),
            MatcherKind::Glob { source, .. } => write!(f, "{source}"),
        }
    }
}

// Leading components of a glob that contain no metacharacters.
fn literal_base(glob: &str) -> ArtifactPath {
    let parsed = ArtifactPath::parse(glob);
    let literal = parsed
        .components()
        .iter()
        .take_while(|c| !c.contains(['*', '?', '[', ']', '{', '}', '\\']))
        .cloned()
        .collect::<Vec<_>>();
    // Every component came out of a parsed path, so none is empty or
    // contains a separator.
    ArtifactPath::new(literal).unwrap_or_default()
}
