//! Dependency graph for tasks
//!
//! Validates a task snapshot into a DAG and keeps a topological order.
//! Uses petgraph for graph storage and cycle extraction.
//!
//! Nodes are inserted in id order, so node indices, the topological order
//! (Kahn's algorithm, smallest ready id first) and every list derived from
//! them are independent of the order the snapshot listed its tasks in.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use thiserror::Error;
use tracing::debug;

use super::id::TaskId;
use super::task::{Task, TaskStatus};

/// Rejection reasons for a task snapshot
///
/// All are fatal: no schedule is computed from a snapshot that fails here.
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Duplicate task id: {task_id}")]
    DuplicateTaskId { task_id: TaskId },

    #[error("Task {task_id} depends on unknown task {dependency}")]
    UnknownDependency { task_id: TaskId, dependency: TaskId },

    /// `path` reads as a dependency chain: each task depends on the next,
    /// and the last entry repeats the first.
    #[error("Dependency cycle: {}", join_path(.path))]
    CyclicDependency { path: Vec<TaskId> },
}

fn join_path(path: &[TaskId]) -> String {
    path.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A validated, acyclic task graph
///
/// Edges point from a dependency to its dependent: "`from` must be done
/// before `to` can start".
#[derive(Debug, Clone)]
pub struct TaskGraph {
    graph: DiGraph<Task, ()>,
    node_map: HashMap<TaskId, NodeIndex>,
    order: Vec<NodeIndex>,
}

impl TaskGraph {
    /// Validates a task collection into a graph
    pub fn build<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Result<Self, ValidationError> {
        let mut tasks: Vec<&Task> = tasks.into_iter().collect();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));

        if let Some(pair) = tasks.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(ValidationError::DuplicateTaskId {
                task_id: pair[0].id.clone(),
            });
        }

        let mut graph = DiGraph::with_capacity(tasks.len(), 0);
        let mut node_map = HashMap::with_capacity(tasks.len());
        for task in &tasks {
            let idx = graph.add_node((*task).clone());
            node_map.insert(task.id.clone(), idx);
        }

        for task in &tasks {
            let task_idx = node_map[&task.id];
            let mut deps: Vec<&TaskId> = task.dependencies.iter().collect();
            deps.sort();
            deps.dedup();

            for dep_id in deps {
                if dep_id == &task.id {
                    return Err(ValidationError::CyclicDependency {
                        path: vec![task.id.clone(), task.id.clone()],
                    });
                }

                let dep_idx = node_map.get(dep_id).ok_or_else(|| {
                    ValidationError::UnknownDependency {
                        task_id: task.id.clone(),
                        dependency: dep_id.clone(),
                    }
                })?;

                graph.add_edge(*dep_idx, task_idx, ());
            }
        }

        let order = match kahn_order(&graph) {
            Some(order) => order,
            None => {
                return Err(ValidationError::CyclicDependency {
                    path: find_cycle(&graph),
                })
            }
        };

        debug!(
            tasks = graph.node_count(),
            edges = graph.edge_count(),
            "Built task graph"
        );

        Ok(Self {
            graph,
            node_map,
            order,
        })
    }

    /// Returns the task with the given id
    pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
        self.node_map.get(task_id).map(|idx| &self.graph[*idx])
    }

    /// Returns all tasks in id order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.graph.node_weights()
    }

    /// Returns all tasks in topological order (dependencies before dependents)
    pub fn topological_order(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().map(|idx| &self.graph[*idx])
    }

    /// Status of every task, keyed by id
    pub fn statuses(&self) -> HashMap<TaskId, TaskStatus> {
        self.tasks().map(|t| (t.id.clone(), t.status)).collect()
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    pub(crate) fn index_of(&self, task_id: &TaskId) -> Option<NodeIndex> {
        self.node_map.get(task_id).copied()
    }

    pub(crate) fn task_at(&self, idx: NodeIndex) -> &Task {
        &self.graph[idx]
    }

    pub(crate) fn order(&self) -> &[NodeIndex] {
        &self.order
    }

    pub(crate) fn dependency_indices(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Incoming)
    }

    pub(crate) fn dependent_indices(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Outgoing)
    }

    /// Every node reachable from `idx` along dependent edges, excluding `idx`
    pub(crate) fn descendants(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut dfs = Dfs::new(&self.graph, idx);
        let mut found = Vec::new();
        while let Some(n) = dfs.next(&self.graph) {
            if n != idx {
                found.push(n);
            }
        }
        found
    }
}

/// Kahn's algorithm; `None` when a cycle keeps some node from being consumed
fn kahn_order(graph: &DiGraph<Task, ()>) -> Option<Vec<NodeIndex>> {
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(n)) = ready.pop() {
        order.push(n);
        for next in graph.neighbors_directed(n, Direction::Outgoing) {
            in_degree[next.index()] -= 1;
            if in_degree[next.index()] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    (order.len() == graph.node_count()).then_some(order)
}

/// Extracts one concrete cycle, as a dependency chain
///
/// Picks the strongly connected component holding the smallest id and walks
/// dependencies breadth-first from that id until it comes back around.
fn find_cycle(graph: &DiGraph<Task, ()>) -> Vec<TaskId> {
    let component = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .min_by_key(|scc| scc.iter().min().copied());

    let Some(component) = component else {
        return Vec::new();
    };
    let members: HashSet<NodeIndex> = component.iter().copied().collect();
    let Some(start) = component.iter().min().copied() else {
        return Vec::new();
    };

    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    let mut closing = None;

    'search: while let Some(n) = queue.pop_front() {
        let mut deps: Vec<NodeIndex> = graph
            .neighbors_directed(n, Direction::Incoming)
            .filter(|d| members.contains(d))
            .collect();
        deps.sort();

        for dep in deps {
            if dep == start {
                closing = Some(n);
                break 'search;
            }
            if dep != start && !parent.contains_key(&dep) {
                parent.insert(dep, n);
                queue.push_back(dep);
            }
        }
    }

    let Some(mut cursor) = closing else {
        return Vec::new();
    };

    // Walk back from the node that closes the loop to `start`
    let mut reversed = vec![graph[start].id.clone(), graph[cursor].id.clone()];
    while cursor != start {
        cursor = parent[&cursor];
        reversed.push(graph[cursor].id.clone());
    }
    reversed.reverse();
    reversed
}
