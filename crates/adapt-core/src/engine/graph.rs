use super::error::EngineError;
use crate::core::models::ids::TaskId;
use crate::core::models::task::TaskSpec;
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::stable_graph::StableDiGraph;

/// The seam through which decisions reach the running task graph.
///
/// Strategies never see an implementor; only the controller attaches work.
pub trait GraphMutator {
    /// Attaches `batch` below `parent` and returns the new ids in batch order.
    ///
    /// Specs without dependencies become children of `parent`; specs with
    /// dependencies become children of the batch members they depend on.
    fn attach(&mut self, parent: TaskId, batch: Vec<TaskSpec>)
    -> Result<Vec<TaskId>, EngineError>;
}

#[derive(Debug, Clone)]
pub struct TaskNode {
    pub spec: TaskSpec,
}

/// In-memory directed acyclic task graph; edges run from parent to child.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    graph: StableDiGraph<TaskNode, ()>,
    roots: Vec<TaskId>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, spec: TaskSpec) -> TaskId {
        let id = self.graph.add_node(TaskNode { spec });
        self.roots.push(id);
        id
    }

    pub fn node(&self, id: TaskId) -> Option<&TaskNode> {
        self.graph.node_weight(id)
    }

    pub fn roots(&self) -> &[TaskId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Children of `id` in insertion order.
    pub fn children(&self, id: TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Parents of `id` in insertion order.
    pub fn parents(&self, id: TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: TaskId, direction: Direction) -> Vec<TaskId> {
        if !self.graph.contains_node(id) {
            return Vec::new();
        }
        let mut found: Vec<TaskId> = self.graph.neighbors_directed(id, direction).collect();
        // Nodes are never removed, so index order is insertion order.
        found.sort();
        found
    }

    /// Every node ordered parents-first; `None` if the graph has a cycle.
    pub fn topological_order(&self) -> Option<Vec<TaskId>> {
        toposort(&self.graph, None).ok()
    }
}

impl GraphMutator for TaskGraph {
    fn attach(
        &mut self,
        parent: TaskId,
        batch: Vec<TaskSpec>,
    ) -> Result<Vec<TaskId>, EngineError> {
        if !self.graph.contains_node(parent) {
            return Err(EngineError::Graph(
                "parent task is not part of the graph".to_string(),
            ));
        }
        for (position, spec) in batch.iter().enumerate() {
            if let Some(&dep) = spec.depends_on.iter().find(|&&d| d >= position) {
                return Err(EngineError::Graph(format!(
                    "task '{}' at position {} depends on position {}, which is not earlier in the batch",
                    spec.name, position, dep
                )));
            }
        }

        let mut ids: Vec<TaskId> = Vec::with_capacity(batch.len());
        for spec in batch {
            let parents: Vec<TaskId> = if spec.depends_on.is_empty() {
                vec![parent]
            } else {
                spec.depends_on.iter().map(|&d| ids[d]).collect()
            };
            let id = self.graph.add_node(TaskNode { spec });
            for p in parents {
                self.graph.add_edge(p, id, ());
            }
            ids.push(id);
        }
        Ok(ids)
    }
}
