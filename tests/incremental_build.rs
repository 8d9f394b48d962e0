// tests/incremental_build.rs

use std::sync::Arc;
use std::sync::atomic::Ordering;

use buildgraph::report::TaskOutcome;
use buildgraph::store::{ContentStore, MemoryStore, StoreView};
use buildgraph::{Build, BuildOptions, FailureMode};
use buildgraph_test_utils::builders::{Behaviour, StubTask, event_log};
use buildgraph_test_utils::{init_tracing, read_text, seeded_store, set_source, with_timeout};

fn options() -> BuildOptions {
    BuildOptions::new(4, FailureMode::Continue)
}

fn compile() -> StubTask {
    StubTask::new("T1").reads("/src/A.txt").writes("/build/A.ir", "ir")
}

fn link() -> StubTask {
    StubTask::new("T2").reads("/build/A.ir").writes("/build/A.bin", "bin")
}

fn chain_build(store: &Arc<MemoryStore>, t1: &StubTask, t2: &StubTask) -> Build {
    Build::new(store.clone(), options())
        .task(t1.clone().into_task())
        .task(t2.clone().into_task())
}

#[tokio::test]
async fn chain_runs_then_is_fresh_then_rebuilds_after_change() {
    init_tracing();
    let store = seeded_store(&[("/src/A.txt", "foo")]);
    let log = event_log();
    let t1 = compile().log_to(&log);
    let t2 = link().log_to(&log);
    let build = chain_build(&store, &t1, &t2);

    // First run: both execute, T1 strictly before T2.
    let report = with_timeout(build.run()).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.executed(), ["T1", "T2"]);
    assert_eq!(store.len(), 3);
    assert_eq!(
        *log.lock().unwrap(),
        ["start:T1", "end:T1", "start:T2", "end:T2"]
    );
    assert_eq!(
        read_text(store.as_ref(), "/build/A.ir").as_deref(),
        Some("T1(/src/A.txt=foo)")
    );

    // Second run, nothing changed: both fresh, neither invoked.
    let report = with_timeout(build.run()).await.unwrap();
    assert_eq!(report.outcome("T1"), Some(&TaskOutcome::Fresh));
    assert_eq!(report.outcome("T2"), Some(&TaskOutcome::Fresh));
    assert_eq!(t1.calls().load(Ordering::SeqCst), 1);
    assert_eq!(t2.calls().load(Ordering::SeqCst), 1);

    // Mutate the source: both rerun.
    set_source(store.as_ref(), "/src/A.txt", "bar");
    let report = with_timeout(build.run()).await.unwrap();
    assert_eq!(report.executed(), ["T1", "T2"]);
    assert_eq!(t2.calls().load(Ordering::SeqCst), 2);

    // Provenance points at the new intermediate, not the old one.
    let ir = store.get(&"/build/A.ir".into()).unwrap().unwrap();
    let bin = store.get(&"/build/A.bin".into()).unwrap().unwrap();
    assert_eq!(bin.source_artifacts().len(), 1);
    assert!(Arc::ptr_eq(&bin.source_artifacts()[0], &ir));
    assert_eq!(ir.source_artifacts()[0].text(), Some("bar"));
    assert!(bin.derivation().is_some());
}

#[tokio::test]
async fn rederived_input_with_same_bytes_still_reruns_consumer() {
    init_tracing();
    let store = seeded_store(&[("/src/A.txt", "foo")]);
    let t1 = compile().behaviour(Behaviour::Measure);
    let t2 = link();
    let build = chain_build(&store, &t1, &t2);
    with_timeout(build.run()).await.unwrap();
    let old_ir = store.get(&"/build/A.ir".into()).unwrap().unwrap();

    // "bar" measures the same as "foo", so T1 rewrites identical bytes.
    set_source(store.as_ref(), "/src/A.txt", "bar");
    let report = with_timeout(build.run()).await.unwrap();
    assert_eq!(report.outcome("T1"), Some(&TaskOutcome::Succeeded));
    assert_eq!(report.outcome("T2"), Some(&TaskOutcome::Succeeded));
    assert_eq!(t2.calls().load(Ordering::SeqCst), 2);

    let ir = store.get(&"/build/A.ir".into()).unwrap().unwrap();
    let bin = store.get(&"/build/A.bin".into()).unwrap().unwrap();
    assert_eq!(ir.payload(), old_ir.payload());
    assert!(Arc::ptr_eq(&bin.source_artifacts()[0], &ir));
    assert_eq!(ir.source_artifacts()[0].text(), Some("bar"));

    // And once settled, both are fresh again.
    let report = with_timeout(build.run()).await.unwrap();
    assert_eq!(report.outcome("T1"), Some(&TaskOutcome::Fresh));
    assert_eq!(report.outcome("T2"), Some(&TaskOutcome::Fresh));
}

#[tokio::test]
async fn rebuild_from_scratch_is_byte_identical() {
    init_tracing();
    let run = |text: &'static str| async move {
        let store = seeded_store(&[("/src/A.txt", text)]);
        let build = chain_build(&store, &compile(), &link());
        build.run().await.unwrap();
        store
    };

    let first = with_timeout(run("foo")).await;
    let second = with_timeout(run("foo")).await;

    for path in ["/build/A.ir", "/build/A.bin"] {
        let a = first.get(&path.into()).unwrap().unwrap();
        let b = second.get(&path.into()).unwrap().unwrap();
        assert_eq!(a.payload(), b.payload());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.derivation(), b.derivation());
    }
}

#[tokio::test]
async fn deleting_an_output_makes_its_producer_stale() {
    init_tracing();
    let store = seeded_store(&[("/src/A.txt", "foo")]);
    let (t1, t2) = (compile(), link());
    let build = chain_build(&store, &t1, &t2);
    with_timeout(build.run()).await.unwrap();

    store.remove(&"/build/A.bin".into()).unwrap();
    let report = with_timeout(build.run()).await.unwrap();

    assert_eq!(report.outcome("T1"), Some(&TaskOutcome::Fresh));
    assert_eq!(report.outcome("T2"), Some(&TaskOutcome::Succeeded));
    assert!(store.contains(&"/build/A.bin".into()).unwrap());
}

#[tokio::test]
async fn unrelated_change_leaves_other_tasks_fresh() {
    init_tracing();
    let store = seeded_store(&[("/src/A.txt", "foo"), ("/src/notes.txt", "x")]);
    let (t1, t2) = (compile(), link());
    let other = StubTask::new("T0").reads("/src/notes.txt").writes("/build/notes", "text");
    let build = chain_build(&store, &t1, &t2).task(other.clone().into_task());
    with_timeout(build.run()).await.unwrap();

    set_source(store.as_ref(), "/src/notes.txt", "y");
    let report = with_timeout(build.run()).await.unwrap();

    assert_eq!(report.outcome("T0"), Some(&TaskOutcome::Succeeded));
    assert_eq!(report.outcome("T1"), Some(&TaskOutcome::Fresh));
    assert_eq!(report.outcome("T2"), Some(&TaskOutcome::Fresh));
}

#[tokio::test]
async fn prefix_input_sees_every_matching_artifact() {
    init_tracing();
    let store = seeded_store(&[("/src/a.txt", "1"), ("/src/b.txt", "2"), ("/srcs/c.txt", "3")]);
    let all = StubTask::new("all").reads_prefix("/src").writes("/build/all", "text");
    let build = Build::new(store.clone(), options()).task(all.into_task());

    with_timeout(build.run()).await.unwrap();
    assert_eq!(
        read_text(store.as_ref(), "/build/all").as_deref(),
        Some("all(/src/a.txt=1,/src/b.txt=2)")
    );

    // A new matching source makes the task stale.
    set_source(store.as_ref(), "/src/c.txt", "4");
    let report = with_timeout(build.run()).await.unwrap();
    assert_eq!(report.outcome("all"), Some(&TaskOutcome::Succeeded));
}

#[tokio::test]
async fn tasks_without_outputs_always_run() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let check = StubTask::new("check");
    let build = Build::new(store.clone(), options()).task(check.clone().into_task());

    with_timeout(build.run()).await.unwrap();
    let report = with_timeout(build.run()).await.unwrap();

    assert_eq!(report.outcome("check"), Some(&TaskOutcome::Succeeded));
    assert_eq!(check.calls().load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn independent_tasks_run_concurrently_up_to_jobs() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let log = event_log();
    let mut build = Build::new(store.clone(), BuildOptions::new(2, FailureMode::Continue));
    for i in 0..4 {
        build.add_task(
            StubTask::new(&format!("t{i}"))
                .writes(&format!("/out/{i}"), "text")
                .delay(std::time::Duration::from_millis(50))
                .log_to(&log)
                .into_task(),
        );
    }

    let report = with_timeout(build.run()).await.unwrap();
    assert!(report.is_success());

    // Never more than two tasks between a start and its end.
    let mut running = 0usize;
    let mut peak = 0usize;
    for entry in log.lock().unwrap().iter() {
        if entry.starts_with("start:") {
            running += 1;
            peak = peak.max(running);
        } else {
            running -= 1;
        }
    }
    assert!(peak <= 2, "peak concurrency was {peak}");
}
