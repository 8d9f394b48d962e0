// src/dag/graph.rs

//! Build graph construction.
//!
//! The graph is derived, never stored: it is recomputed from task
//! declarations for every build. Construction is pure apart from read-only
//! existence checks against the store, so it can be exercised with stub
//! tasks that never run.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, info};

use crate::artifact::ArtifactPath;
use crate::errors::{BuildError, Result};
use crate::store::StoreView;
use crate::task::{InputMatcher, OutputDecl, Task, TaskId};

/// A schedulable task together with the declarations captured from it.
///
/// Declarations are read exactly once, here; the runner only ever consults
/// the captured copies.
pub struct TaskNode {
    pub id: TaskId,
    pub task: Arc<dyn Task>,
    pub inputs: Vec<InputMatcher>,
    pub outputs: Vec<OutputDecl>,
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs: Vec<String> = self.inputs.iter().map(|m| m.to_string()).collect();
        let outputs: Vec<String> = self.outputs.iter().map(|o| o.path.to_string()).collect();
        f.debug_struct("TaskNode")
            .field("id", &self.id)
            .field("inputs", &inputs)
            .field("outputs", &outputs)
            .finish()
    }
}

/// Internal node structure: stores the task plus immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    node: Arc<TaskNode>,
    /// Producers of this task's inputs; they must succeed first.
    deps: Vec<TaskId>,
    /// Tasks that read something this task writes.
    dependents: Vec<TaskId>,
}

/// Dependency graph over the leaf tasks of a build, keyed by task id.
#[derive(Debug, Clone)]
pub struct BuildGraph {
    nodes: BTreeMap<TaskId, DagNode>,
}

impl BuildGraph {
    /// Expand `roots`, resolve every declared input to its producers, and
    /// validate the result.
    ///
    /// Fails with:
    /// - `DuplicateTask` if two leaf tasks share an id;
    /// - `DuplicateProducer` if two tasks declare the same output;
    /// - `DanglingInput` if an exact input has neither a producer nor an
    ///   artifact in `store`;
    /// - `Cycle` if the dependencies are cyclic.
    pub fn build(roots: &[Arc<dyn Task>], store: &dyn StoreView) -> Result<Self> {
        let leaves = flatten(roots)?;

        let mut captured: BTreeMap<TaskId, Arc<TaskNode>> = BTreeMap::new();
        for task in leaves {
            let id = task.id();
            let inputs = task
                .inputs()
                .iter()
                .map(|decl| decl.compile())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|source| BuildError::InvalidPattern {
                    task: id.clone(),
                    source,
                })?;
            let outputs = task.outputs();
            let node = TaskNode {
                id: id.clone(),
                task,
                inputs,
                outputs,
            };
            if captured.insert(id.clone(), Arc::new(node)).is_some() {
                return Err(BuildError::DuplicateTask(id));
            }
        }

        let producers = index_producers(&captured)?;

        let mut deps: BTreeMap<TaskId, BTreeSet<TaskId>> = BTreeMap::new();
        for (id, node) in captured.iter() {
            let resolved = resolve_inputs(node, &captured, &producers, store)?;
            deps.insert(id.clone(), resolved);
        }

        let mut nodes: BTreeMap<TaskId, DagNode> = captured
            .into_iter()
            .map(|(id, node)| {
                let node_deps = deps
                    .get(&id)
                    .map(|d| d.iter().cloned().collect())
                    .unwrap_or_default();
                (
                    id,
                    DagNode {
                        node,
                        deps: node_deps,
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        // Second pass: populate dependents based on deps.
        for (id, node_deps) in deps.iter() {
            for dep in node_deps {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(id.clone());
                }
            }
        }

        let graph = Self { nodes };
        if let Some(cycle) = graph.find_cycle() {
            return Err(BuildError::Cycle(cycle));
        }

        info!(tasks = graph.len(), "build graph constructed");
        Ok(graph)
    }

    /// All task ids, in id order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn node(&self, id: &str) -> Option<&Arc<TaskNode>> {
        self.nodes.get(id).map(|n| &n.node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Immediate producers a task waits for, in id order.
    pub fn dependencies_of(&self, id: &str) -> &[TaskId] {
        self.nodes
            .get(id)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate consumers of a task's outputs, in id order.
    pub fn dependents_of(&self, id: &str) -> &[TaskId] {
        self.nodes
            .get(id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Every declared output of every task, in path order.
    pub fn outputs(&self) -> Vec<ArtifactPath> {
        let mut out: Vec<ArtifactPath> = self
            .nodes
            .values()
            .flat_map(|n| n.node.outputs.iter().map(|o| o.path.clone()))
            .collect();
        out.sort();
        out
    }

    /// Group tasks into waves: every task in a wave depends only on tasks in
    /// earlier waves. Tasks within a wave are in id order.
    pub fn waves(&self) -> Vec<Vec<TaskId>> {
        let mut remaining: BTreeMap<&str, usize> = self
            .nodes
            .iter()
            .map(|(id, n)| (id.as_str(), n.deps.len()))
            .collect();
        let mut waves = Vec::new();

        while !remaining.is_empty() {
            let wave: Vec<TaskId> = remaining
                .iter()
                .filter(|(_, count)| **count == 0)
                .map(|(id, _)| id.to_string())
                .collect();
            if wave.is_empty() {
                // Unreachable for a validated graph.
                break;
            }
            for id in &wave {
                remaining.remove(id.as_str());
                for dependent in self.dependents_of(id) {
                    if let Some(count) = remaining.get_mut(dependent.as_str()) {
                        *count -= 1;
                    }
                }
            }
            waves.push(wave);
        }

        waves
    }

    /// Find one cycle, ordered along consumer → producer edges and closed by
    /// repeating its first task. The cycle through the smallest task id is
    /// reported so diagnostics are reproducible.
    fn find_cycle(&self) -> Option<Vec<TaskId>> {
        let ids: Vec<&TaskId> = self.nodes.keys().collect();
        let index: BTreeMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        // Edge direction: consumer -> producer.
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for i in 0..ids.len() {
            graph.add_node(i);
        }
        for (id, node) in self.nodes.iter() {
            for dep in &node.deps {
                graph.add_edge(index[id.as_str()], index[dep.as_str()], ());
            }
        }

        let cyclic = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .min_by_key(|scc| scc.iter().copied().min().unwrap_or(usize::MAX))?;

        let members: BTreeSet<usize> = cyclic.iter().copied().collect();
        let start = *members.iter().next()?;
        let path = walk_cycle(&graph, &members, start)?;

        let cycle: Vec<TaskId> = path.into_iter().map(|i| ids[i].clone()).collect();
        debug!(?cycle, "cycle found in build graph");
        Some(cycle)
    }
}

/// Depth-first walk inside one strongly connected component until we get
/// back to `start`. Neighbours are visited in index (= id) order.
fn walk_cycle(
    graph: &DiGraphMap<usize, ()>,
    members: &BTreeSet<usize>,
    start: usize,
) -> Option<Vec<usize>> {
    let mut path = vec![start];
    let mut visited = BTreeSet::from([start]);
    let mut stack: Vec<Vec<usize>> = vec![sorted_successors(graph, members, start)];

    while let Some(frontier) = stack.last_mut() {
        let Some(next) = frontier.pop() else {
            stack.pop();
            path.pop();
            continue;
        };
        if next == start {
            path.push(start);
            return Some(path);
        }
        if visited.insert(next) {
            path.push(next);
            stack.push(sorted_successors(graph, members, next));
        }
    }

    None
}

// Reversed so that `pop` yields the smallest first.
fn sorted_successors(
    graph: &DiGraphMap<usize, ()>,
    members: &BTreeSet<usize>,
    node: usize,
) -> Vec<usize> {
    let mut next: Vec<usize> = graph
        .neighbors(node)
        .filter(|n| members.contains(n))
        .collect();
    next.sort_unstable_by(|a, b| b.cmp(a));
    next
}

/// Expand composites into their leaf tasks.
fn flatten(roots: &[Arc<dyn Task>]) -> Result<Vec<Arc<dyn Task>>> {
    let mut leaves = Vec::new();
    let mut seen_groups: BTreeSet<TaskId> = BTreeSet::new();
    let mut stack: Vec<Arc<dyn Task>> = roots.iter().rev().cloned().collect();

    while let Some(task) = stack.pop() {
        if task.is_composite() {
            let id = task.id();
            if !seen_groups.insert(id.clone()) {
                return Err(BuildError::DuplicateTask(id));
            }
            debug!(group = %id, "expanding composite task");
            stack.extend(task.subtasks().into_iter().rev());
        } else {
            leaves.push(task);
        }
    }

    Ok(leaves)
}

/// Map every declared output path to the task producing it.
fn index_producers(
    nodes: &BTreeMap<TaskId, Arc<TaskNode>>,
) -> Result<BTreeMap<ArtifactPath, TaskId>> {
    let mut producers: BTreeMap<ArtifactPath, TaskId> = BTreeMap::new();

    for (id, node) in nodes.iter() {
        for output in &node.outputs {
            if output.path.is_root() {
                return Err(BuildError::Configuration(format!(
                    "task '{}' declares the store root as an output",
                    id
                )));
            }
            if let Some(first) = producers.get(&output.path) {
                if first == id {
                    return Err(BuildError::Configuration(format!(
                        "task '{}' declares output '{}' twice",
                        id, output.path
                    )));
                }
                return Err(BuildError::DuplicateProducer {
                    path: output.path.clone(),
                    first: first.clone(),
                    second: id.clone(),
                });
            }
            producers.insert(output.path.clone(), id.clone());
        }
    }

    Ok(producers)
}

/// Producers of everything `node` reads.
fn resolve_inputs(
    node: &TaskNode,
    nodes: &BTreeMap<TaskId, Arc<TaskNode>>,
    producers: &BTreeMap<ArtifactPath, TaskId>,
    store: &dyn StoreView,
) -> Result<BTreeSet<TaskId>> {
    let mut deps = BTreeSet::new();

    for input in &node.inputs {
        if let Some(path) = input.exact() {
            match producers.get(path) {
                Some(producer) => {
                    check_declared_type(node, input, path, nodes.get(producer))?;
                    deps.insert(producer.clone());
                }
                None if store.contains(path)? => {
                    debug!(task = %node.id, path = %path, "input satisfied by existing artifact");
                }
                None => {
                    return Err(BuildError::DanglingInput {
                        task: node.id.clone(),
                        path: path.clone(),
                    });
                }
            }
            continue;
        }

        let root = input.scan_root();
        for (path, producer) in producers
            .range(root.clone()..)
            .take_while(|(path, _)| path.starts_with(root))
        {
            if input.matches(path) {
                deps.insert(producer.clone());
            }
        }
    }

    Ok(deps)
}

// An exact, typed input whose producer declares a different type can never
// succeed; reject it before anything runs.
fn check_declared_type(
    node: &TaskNode,
    input: &InputMatcher,
    path: &ArtifactPath,
    producer: Option<&Arc<TaskNode>>,
) -> Result<()> {
    let (Some(expected), Some(producer)) = (input.content_type(), producer) else {
        return Ok(());
    };
    let declared = producer.outputs.iter().find(|o| &o.path == path);
    match declared {
        Some(output) if &output.content_type != expected => {
            Err(BuildError::Configuration(format!(
                "task '{}' reads '{}' as '{}', but '{}' produces it as '{}'",
                node.id, path, expected, producer.id, output.content_type
            )))
        }
        _ => Ok(()),
    }
}
