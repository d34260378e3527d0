// src/dag/graph.rs

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::errors::{Result, StepwatchError};

/// Stable identifier of a (job, step) pair.
pub type StepId = String;

/// Build the [`StepId`] for the step at 1-based `position` in `job_id`.
pub fn step_id(job_id: &str, position: usize) -> StepId {
    format!("{job_id}#{position}")
}

/// One (job, step) pair in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepNode {
    pub id: StepId,
    pub job_id: String,
    pub step_name: String,
    /// 1-based position within the job.
    pub position: usize,
}

/// Step dependency graph.
///
/// Edge direction: dependency -> dependent. For "Build needs Checkout" we add
/// the edge Checkout -> Build.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<StepNode, ()>,
    index: HashMap<StepId, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Returns `false` if a node with the same id exists.
    pub fn add_node(&mut self, node: StepNode) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        true
    }

    /// Record that `dependent` directly depends on `dependency`.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) -> Result<()> {
        let to = self.lookup(dependent)?;
        let from = self.lookup(dependency)?;
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node(&self, id: &str) -> Option<&StepNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &StepNode> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    /// Direct dependencies of `id`.
    pub fn dependencies_of(&self, id: &str) -> Vec<&StepNode> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Every ancestor of `id`, in insertion order. Unknown ids have none.
    pub fn transitive_dependencies(&self, id: &str) -> Vec<&StepNode> {
        let Some(&start) = self.index.get(id) else {
            return Vec::new();
        };

        let mut stack: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(start, Direction::Incoming)
            .collect();
        let mut visited: HashSet<NodeIndex> = HashSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            stack.extend(self.graph.neighbors_directed(current, Direction::Incoming));
        }

        let mut found: Vec<NodeIndex> = visited.into_iter().filter(|&n| n != start).collect();
        found.sort();
        found.into_iter().map(|idx| &self.graph[idx]).collect()
    }

    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Kahn's algorithm. Among ready nodes the earliest inserted goes first,
    /// so a cycle-free sequential pipeline comes back in declaration order.
    pub fn topological_order(&self) -> Result<Vec<&StepNode>> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                let deg = self
                    .graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .count();
                (idx, deg)
            })
            .collect();

        let mut ready: BTreeSet<NodeIndex> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(&idx, _)| idx)
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());

        while let Some(idx) = ready.pop_first() {
            order.push(&self.graph[idx]);
            for next in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(deg) = in_degree.get_mut(&next) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(next);
                    }
                }
            }
        }

        if order.len() != self.graph.node_count() {
            let stuck: Vec<&str> = in_degree
                .iter()
                .filter(|&(_, &deg)| deg > 0)
                .map(|(&idx, _)| self.graph[idx].id.as_str())
                .collect();
            return Err(StepwatchError::DependencyCycle(format!(
                "steps involved: {}",
                stuck.join(", ")
            )));
        }

        Ok(order)
    }

    fn neighbors(&self, id: &str, dir: Direction) -> Vec<&StepNode> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut found: Vec<NodeIndex> = self.graph.neighbors_directed(idx, dir).collect();
        found.sort();
        found.into_iter().map(|n| &self.graph[n]).collect()
    }

    fn lookup(&self, id: &str) -> Result<NodeIndex> {
        self.index.get(id).copied().ok_or_else(|| {
            StepwatchError::PipelineError(format!("unknown step '{id}' in dependency graph"))
        })
    }
}
