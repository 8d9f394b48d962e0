// tests/runtime_fake_executor.rs

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use buildgraph::dag::{BuildGraph, Scheduler};
use buildgraph::engine::{CoreRuntime, EngineEvent, ExecOutcome, Runtime};
use buildgraph::report::TaskOutcome;
use buildgraph::store::MemoryStore;
use buildgraph::types::FailureMode;
use buildgraph_test_utils::builders::StubTask;
use buildgraph_test_utils::fake_executor::ScriptedExecutor;
use buildgraph_test_utils::{init_tracing, with_timeout};

/// Chain `compile -> link -> package`, plus an independent `docs`.
fn chain() -> BuildGraph {
    let tasks = vec![
        StubTask::new("compile").writes("/build/A.ir", "ir").into_task(),
        StubTask::new("link").reads("/build/A.ir").writes("/build/A.bin", "bin").into_task(),
        StubTask::new("package").reads("/build/A.bin").writes("/dist/A.tar", "tar").into_task(),
        StubTask::new("docs").writes("/dist/A.html", "html").into_task(),
    ];
    BuildGraph::build(&tasks, &MemoryStore::new()).unwrap()
}

#[tokio::test]
async fn runtime_runs_chain_in_order() {
    init_tracing();

    let (tx, rx) = mpsc::channel::<EngineEvent>(16);
    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let executor = ScriptedExecutor::new(tx.clone(), Arc::clone(&dispatched));

    let core = CoreRuntime::new(Scheduler::new(chain(), 4, FailureMode::Continue));
    let outcomes = with_timeout(Runtime::new(core, rx, executor).run())
        .await
        .unwrap();

    let order = dispatched.lock().unwrap().clone();
    assert_eq!(order, ["compile", "docs", "link", "package"]);
    assert!(outcomes.values().all(|o| *o == TaskOutcome::Succeeded));
}

#[tokio::test]
async fn runtime_reports_failed_and_blocked_tasks() {
    init_tracing();

    let (tx, rx) = mpsc::channel::<EngineEvent>(16);
    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let executor = ScriptedExecutor::new(tx.clone(), Arc::clone(&dispatched)).failing("link");

    let core = CoreRuntime::new(Scheduler::new(chain(), 4, FailureMode::Continue));
    let outcomes = with_timeout(Runtime::new(core, rx, executor).run())
        .await
        .unwrap();

    assert_eq!(
        outcomes["link"],
        TaskOutcome::Failed { reason: "link failed".into() }
    );
    assert_eq!(
        outcomes["package"],
        TaskOutcome::Blocked { upstream: "link".into() }
    );
    assert_eq!(outcomes["docs"], TaskOutcome::Succeeded);
    assert!(!dispatched.lock().unwrap().contains(&"package".to_string()));
}

#[tokio::test]
async fn runtime_honours_fresh_outcomes() {
    init_tracing();

    let (tx, rx) = mpsc::channel::<EngineEvent>(16);
    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let executor = ScriptedExecutor::new(tx.clone(), Arc::clone(&dispatched))
        .with_outcome("compile", ExecOutcome::Fresh);

    let core = CoreRuntime::new(Scheduler::new(chain(), 1, FailureMode::Stop));
    let outcomes = with_timeout(Runtime::new(core, rx, executor).run())
        .await
        .unwrap();

    assert_eq!(outcomes["compile"], TaskOutcome::Fresh);
    assert_eq!(outcomes["package"], TaskOutcome::Succeeded);
    // One job: strictly one task at a time, in id order among ready tasks.
    assert_eq!(
        *dispatched.lock().unwrap(),
        ["compile", "docs", "link", "package"]
    );
}

#[test]
fn core_shutdown_cancels_everything_not_started() {
    let mut core = CoreRuntime::new(Scheduler::new(chain(), 1, FailureMode::Continue));
    let step = core.start();
    assert!(step.keep_running);

    let step = core.step(EngineEvent::ShutdownRequested);
    assert!(step.keep_running, "compile is still running");

    let step = core.step(EngineEvent::TaskCompleted {
        task: "compile".into(),
        outcome: ExecOutcome::Succeeded,
    });
    assert!(!step.keep_running);
    assert!(core.is_finished());

    let outcomes = core.outcomes();
    assert_eq!(outcomes["compile"], TaskOutcome::Succeeded);
    assert_eq!(outcomes["docs"], TaskOutcome::Cancelled);
    assert_eq!(outcomes["link"], TaskOutcome::Cancelled);
}
