// tests/artifact_path.rs

use buildgraph::artifact::fingerprint::{content_fingerprint, input_fingerprint};
use buildgraph::artifact::{Artifact, ArtifactPath, ContentType, PathError};
use buildgraph::store::StoreError;

#[test]
fn parse_and_display_round_trip() {
    let p = ArtifactPath::parse("/build/A.ir");
    assert_eq!(p.components(), ["build", "A.ir"]);
    assert_eq!(p.to_string(), "/build/A.ir");
    assert_eq!(p.name(), Some("A.ir"));

    // Empty segments are ignored.
    assert_eq!(ArtifactPath::parse("//build///A.ir/"), p);
    assert!(ArtifactPath::parse("/").is_root());
    assert_eq!(ArtifactPath::root().to_string(), "/");
}

#[test]
fn new_rejects_bad_components() {
    assert_eq!(
        ArtifactPath::new(["build", ""]),
        Err(PathError::EmptyComponent)
    );
    assert!(matches!(
        ArtifactPath::new(["build", "a/b"]),
        Err(PathError::SeparatorInComponent(_))
    ));
    assert!(ArtifactPath::root().join("").is_err());
}

#[test]
fn ordering_is_component_wise_lexicographic() {
    let mut paths: Vec<ArtifactPath> = ["/b", "/a/z", "/a", "/a/b/c", "/a/b", "/ab"]
        .into_iter()
        .map(ArtifactPath::parse)
        .collect();
    paths.sort();

    let rendered: Vec<String> = paths.iter().map(ToString::to_string).collect();
    // A parent sorts immediately before its descendants.
    assert_eq!(rendered, ["/a", "/a/b", "/a/b/c", "/a/z", "/ab", "/b"]);
}

#[test]
fn ancestry_is_strict_and_component_based() {
    let src = ArtifactPath::parse("/src");
    let file = ArtifactPath::parse("/src/A.txt");
    let other = ArtifactPath::parse("/srcs/A.txt");

    assert!(src.is_ancestor_of(&file));
    assert!(file.is_descendant_of(&src));
    assert!(!src.is_ancestor_of(&src));
    assert!(!src.is_ancestor_of(&other));
    assert!(ArtifactPath::root().is_ancestor_of(&src));

    assert!(file.starts_with(&src));
    assert!(src.starts_with(&src));
    assert_eq!(file.parent(), Some(src.clone()));
    assert_eq!(src.parent(), Some(ArtifactPath::root()));
    assert_eq!(ArtifactPath::root().parent(), None);
}

#[test]
fn artifacts_cannot_live_at_the_root() {
    let err = Artifact::source(ArtifactPath::root(), "text".into(), b"x".to_vec()).unwrap_err();
    assert_eq!(err, StoreError::RootPath);
}

#[test]
fn fingerprints_depend_on_type_and_payload() {
    let text = ContentType::new("text");
    let ir = ContentType::new("ir");

    assert_eq!(
        content_fingerprint(&text, b"foo"),
        content_fingerprint(&text, b"foo")
    );
    assert_ne!(
        content_fingerprint(&text, b"foo"),
        content_fingerprint(&text, b"bar")
    );
    assert_ne!(
        content_fingerprint(&text, b"foo"),
        content_fingerprint(&ir, b"foo")
    );
}

#[test]
fn input_fingerprint_depends_on_task_paths_and_content() {
    let a = Artifact::source("/src/a".into(), "text".into(), b"foo".to_vec()).unwrap();
    let a2 = Artifact::source("/src/a".into(), "text".into(), b"bar".to_vec()).unwrap();
    let b = Artifact::source("/src/b".into(), "text".into(), b"foo".to_vec()).unwrap();

    let fp = |task: &str, artifact: &Artifact| {
        input_fingerprint(task, [(artifact.path(), artifact)])
    };

    assert_eq!(fp("t", &a), fp("t", &a));
    assert_ne!(fp("t", &a), fp("u", &a));
    assert_ne!(fp("t", &a), fp("t", &a2));
    assert_ne!(fp("t", &a), fp("t", &b));
}
