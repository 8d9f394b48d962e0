// tests/failure_handling.rs

use std::sync::Arc;
use std::sync::atomic::Ordering;

use buildgraph::artifact::ArtifactPath;
use buildgraph::report::TaskOutcome;
use buildgraph::store::{MemoryStore, StoreView};
use buildgraph::{Build, BuildError, BuildOptions, FailureMode};
use buildgraph_test_utils::builders::{Behaviour, StubTask};
use buildgraph_test_utils::failing_store::FailingStore;
use buildgraph_test_utils::{init_tracing, read_text, seeded_store, set_source, with_timeout};

fn options(mode: FailureMode) -> BuildOptions {
    BuildOptions::new(4, mode)
}

#[tokio::test]
async fn failed_task_blocks_dependents_and_fails_the_build() {
    init_tracing();
    let store = seeded_store(&[("/src/A.txt", "foo")]);
    let t1 = StubTask::new("T1").reads("/src/A.txt").writes("/build/A.ir", "ir").fails();
    let t2 = StubTask::new("T2").reads("/build/A.ir").writes("/build/A.bin", "bin");
    let build = Build::new(store.clone(), options(FailureMode::Continue))
        .task(t1.into_task())
        .task(t2.clone().into_task());

    let report = with_timeout(build.run()).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.failed(), ["T1"]);
    assert_eq!(
        report.outcome("T2"),
        Some(&TaskOutcome::Blocked { upstream: "T1".into() })
    );
    assert_eq!(t2.calls().load(Ordering::SeqCst), 0);
    assert!(store.get(&"/build/A.ir".into()).unwrap().is_none());
}

#[tokio::test]
async fn errors_and_panics_are_task_failures() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let build = Build::new(store.clone(), options(FailureMode::Continue))
        .task(StubTask::new("err").writes("/e", "text").errors("disk on fire").into_task())
        .task(StubTask::new("panic").writes("/p", "text").panics().into_task())
        .task(StubTask::new("ok").writes("/o", "text").into_task());

    let report = with_timeout(build.run()).await.unwrap();

    match report.outcome("err") {
        Some(TaskOutcome::Failed { reason }) => assert!(reason.contains("disk on fire")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(matches!(report.outcome("panic"), Some(TaskOutcome::Failed { .. })));
    assert_eq!(report.outcome("ok"), Some(&TaskOutcome::Succeeded));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn partial_or_undeclared_writes_commit_nothing() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let build = Build::new(store.clone(), options(FailureMode::Continue))
        .task(
            StubTask::new("partial")
                .writes("/p/1", "text")
                .writes("/p/2", "text")
                .behaviour(Behaviour::Partial)
                .into_task(),
        )
        .task(
            StubTask::new("sneaky")
                .writes("/s/1", "text")
                .behaviour(Behaviour::WriteUndeclared("/s/hidden".into()))
                .into_task(),
        );

    let report = with_timeout(build.run()).await.unwrap();

    assert_eq!(report.failed(), ["partial", "sneaky"]);
    assert!(store.is_empty());
}

#[tokio::test]
async fn failed_rebuild_keeps_last_good_outputs_and_reports_them_stale() {
    init_tracing();
    let store = seeded_store(&[("/src/A.txt", "foo")]);
    let good = StubTask::new("T1").reads("/src/A.txt").writes("/build/A.ir", "ir");
    let link = StubTask::new("T2").reads("/build/A.ir").writes("/build/A.bin", "bin");
    with_timeout(
        Build::new(store.clone(), options(FailureMode::Continue))
            .task(good.into_task())
            .task(link.clone().into_task())
            .run(),
    )
    .await
    .unwrap();
    let before = read_text(store.as_ref(), "/build/A.ir");

    set_source(store.as_ref(), "/src/A.txt", "bar");
    let bad = StubTask::new("T1").reads("/src/A.txt").writes("/build/A.ir", "ir").fails();
    let report = with_timeout(
        Build::new(store.clone(), options(FailureMode::Continue))
            .task(bad.into_task())
            .task(link.into_task())
            .run(),
    )
    .await
    .unwrap();

    assert_eq!(read_text(store.as_ref(), "/build/A.ir"), before);
    assert_eq!(
        report.stale_artifacts.iter().map(ToString::to_string).collect::<Vec<_>>(),
        ["/build/A.bin", "/build/A.ir"]
    );
    assert_eq!(
        report.outcome("T2"),
        Some(&TaskOutcome::Blocked { upstream: "T1".into() })
    );
    assert!(report.to_string().contains("stale: /build/A.ir"));
}

#[tokio::test]
async fn stop_mode_cancels_tasks_not_yet_started() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let later = StubTask::new("b-later").reads("/a").writes("/b", "text");
    let build = Build::new(store.clone(), BuildOptions::new(1, FailureMode::Stop))
        .task(StubTask::new("a-fails").writes("/a", "text").fails().into_task())
        .task(later.clone().into_task())
        .task(StubTask::new("c-independent").writes("/c", "text").into_task());

    let report = with_timeout(build.run()).await.unwrap();

    assert_eq!(report.failed(), ["a-fails"]);
    assert_eq!(report.blocked(), ["b-later"]);
    assert_eq!(report.cancelled(), ["c-independent"]);
    assert_eq!(later.calls().load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn continue_mode_runs_independent_branches() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let build = Build::new(store.clone(), BuildOptions::new(1, FailureMode::Continue))
        .task(StubTask::new("a-fails").writes("/a", "text").fails().into_task())
        .task(StubTask::new("c-independent").writes("/c", "text").into_task());

    let report = with_timeout(build.run()).await.unwrap();
    assert_eq!(report.outcome("c-independent"), Some(&TaskOutcome::Succeeded));
}

#[tokio::test]
async fn invalid_graph_runs_nothing() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let a = StubTask::new("a").reads("/b").writes("/a", "text");
    let b = StubTask::new("b").reads("/a").writes("/b", "text");
    let build = Build::new(store.clone(), options(FailureMode::Continue))
        .task(a.clone().into_task())
        .task(b.clone().into_task());

    let err = with_timeout(build.run()).await.unwrap_err();

    assert!(matches!(err, BuildError::Cycle(_)));
    assert_eq!(a.calls().load(Ordering::SeqCst), 0);
    assert_eq!(b.calls().load(Ordering::SeqCst), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn shutdown_request_still_terminates_the_build() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let build = Build::new(store.clone(), options(FailureMode::Continue))
        .task(StubTask::new("slow").writes("/s", "text").into_task());

    let report = with_timeout(build.run_until(async {})).await.unwrap();

    // The task may have been dispatched before the request arrived; either
    // way the build terminates and nothing is left pending.
    assert!(matches!(
        report.outcome("slow"),
        Some(TaskOutcome::Succeeded) | Some(TaskOutcome::Cancelled)
    ));
}

#[tokio::test]
async fn store_error_on_commit_fails_the_task_and_writes_nothing() {
    init_tracing();
    let inner = seeded_store(&[("/src/A.txt", "foo")]);
    let store = Arc::new(FailingStore::new(inner.clone(), "/build/A.map"));
    let listing = |s: &MemoryStore| -> Vec<(String, String)> {
        s.get_all(&ArtifactPath::root())
            .unwrap()
            .iter()
            .map(|a| (a.path().to_string(), a.fingerprint().to_hex()))
            .collect()
    };
    let before = listing(inner.as_ref());

    let t1 = StubTask::new("T1")
        .reads("/src/A.txt")
        .writes("/build/A.ir", "ir")
        .writes("/build/A.map", "text");
    let t2 = StubTask::new("T2").reads("/build/A.ir").writes("/build/A.bin", "bin");
    let build = Build::new(store.clone(), options(FailureMode::Continue))
        .task(t1.clone().into_task())
        .task(t2.clone().into_task());

    let report = with_timeout(build.run()).await.unwrap();

    match report.outcome("T1") {
        Some(TaskOutcome::Failed { reason }) => assert!(reason.contains("simulated crash")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(
        report.outcome("T2"),
        Some(&TaskOutcome::Blocked { upstream: "T1".into() })
    );
    assert_eq!(t1.calls().load(Ordering::SeqCst), 1);
    assert_eq!(t2.calls().load(Ordering::SeqCst), 0);
    assert_eq!(store.rejected(), 1);
    assert_eq!(listing(inner.as_ref()), before);
}
