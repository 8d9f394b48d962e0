// tests/scheduler_properties.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use proptest::prelude::*;

use buildgraph::dag::{BuildGraph, Scheduler};
use buildgraph::engine::ExecOutcome;
use buildgraph::report::TaskOutcome;
use buildgraph::store::MemoryStore;
use buildgraph::task::Task;
use buildgraph::types::FailureMode;
use buildgraph_test_utils::builders::StubTask;

fn name(i: usize) -> String {
    format!("task_{i:02}")
}

// Strategy to generate a random acyclic graph.
// Task N may only read outputs of tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    if i == 0 {
                        BTreeSet::new()
                    } else {
                        potential.into_iter().map(|d| d % i).collect()
                    }
                })
                .collect()
        })
    })
}

fn graph_from(deps: &[BTreeSet<usize>]) -> BuildGraph {
    let tasks: Vec<Arc<dyn Task>> = deps
        .iter()
        .enumerate()
        .map(|(i, ds)| {
            let mut t = StubTask::new(&name(i)).writes(&format!("/out/{i}"), "text");
            for d in ds {
                t = t.reads(&format!("/out/{d}"));
            }
            t.into_task()
        })
        .collect();
    BuildGraph::build(&tasks, &MemoryStore::new()).expect("generated graph is valid")
}

proptest! {
    #[test]
    fn scheduler_terminates_and_respects_dependencies(
        deps in dag_strategy(12),
        failing in proptest::collection::btree_set(0..12usize, 0..4),
        jobs in 1..4usize,
        stop in any::<bool>(),
        pick in proptest::collection::vec(any::<usize>(), 64),
    ) {
        let mode = if stop { FailureMode::Stop } else { FailureMode::Continue };
        let failing: BTreeSet<String> = failing.into_iter().map(name).collect();
        let mut scheduler = Scheduler::new(graph_from(&deps), jobs, mode);

        let mut executing: Vec<String> = scheduler.start().into_iter().map(|t| t.id).collect();
        let mut dispatched: BTreeSet<String> = executing.iter().cloned().collect();
        let mut succeeded: BTreeSet<String> = BTreeSet::new();
        let mut steps = 0usize;

        while !executing.is_empty() {
            prop_assert!(executing.len() <= jobs, "more than {} tasks running", jobs);
            steps += 1;
            prop_assert!(steps <= 1000, "scheduler did not terminate");

            // Complete an arbitrary running task.
            let idx = pick[steps % pick.len()] % executing.len();
            let task = executing.remove(idx);
            let outcome = if failing.contains(&task) {
                ExecOutcome::Failed("scripted".into())
            } else {
                succeeded.insert(task.clone());
                ExecOutcome::Succeeded
            };

            for next in scheduler.handle_completion(&task, outcome) {
                // Every producer must have succeeded before dispatch.
                for dep in scheduler.graph().dependencies_of(&next.id) {
                    prop_assert!(succeeded.contains(dep), "{} ran before {}", next.id, dep);
                }
                prop_assert!(dispatched.insert(next.id.clone()), "{} dispatched twice", next.id);
                executing.push(next.id);
            }
        }

        prop_assert!(scheduler.is_finished());

        let outcomes: BTreeMap<String, TaskOutcome> = scheduler.outcomes();
        prop_assert_eq!(outcomes.len(), deps.len());
        for (id, outcome) in &outcomes {
            match outcome {
                TaskOutcome::Succeeded => prop_assert!(succeeded.contains(id)),
                TaskOutcome::Failed { .. } => prop_assert!(failing.contains(id)),
                TaskOutcome::Blocked { upstream } => {
                    prop_assert!(matches!(outcomes[upstream], TaskOutcome::Failed { .. }), "blocked task upstream must have failed");
                }
                TaskOutcome::Cancelled => prop_assert!(stop, "cancelled outside stop mode"),
                TaskOutcome::Fresh => prop_assert!(false, "nothing was reported fresh"),
            }
        }

        if !stop {
            // In continue mode every task whose producers all succeeded ran.
            for (i, ds) in deps.iter().enumerate() {
                let ready = ds.iter().all(|d| succeeded.contains(&name(*d)));
                prop_assert_eq!(dispatched.contains(&name(i)), ready);
            }
        }
    }
}
