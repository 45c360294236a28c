//! In-memory code graph.
//!
//! A petgraph `DiGraph` whose node weights are [`Chunk`]s and whose edge
//! weights are [`Relation`]s with `from`/`to` rewritten to resolved node
//! ids. Parallel edges are kept. The graph is built once by
//! [`crate::graph::builder::GraphBuilder`] and only read afterwards.
//!
//! Neighbour queries return ids in edge insertion order so that every
//! traversal over the graph is deterministic.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::error::{RepoMindError, Result};
use crate::types::{Chunk, Relation, RelationKind};

/// Snapshot format version written by [`CodeGraph::to_snapshot`].
pub const SNAPSHOT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// CodeGraph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CodeGraph {
    graph: DiGraph<Chunk, Relation>,
    index: HashMap<String, NodeIndex>,
    dropped_relations: usize,
}

impl CodeGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a node; a chunk whose id is already present is ignored.
    pub(crate) fn add_node(&mut self, chunk: Chunk) -> bool {
        if self.index.contains_key(&chunk.id) {
            return false;
        }
        let id = chunk.id.clone();
        let idx = self.graph.add_node(chunk);
        self.index.insert(id, idx);
        true
    }

    /// Add an edge between two present nodes. Returns `false` if either is missing.
    pub(crate) fn add_edge(&mut self, relation: Relation) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(&relation.from), self.index.get(&relation.to))
        else {
            return false;
        };
        self.graph.add_edge(a, b, relation);
        true
    }

    pub(crate) fn set_dropped_relations(&mut self, count: usize) {
        self.dropped_relations = count;
    }

    // -- lookups ------------------------------------------------------------

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Relations dropped at build time because an endpoint did not resolve.
    pub fn dropped_relations(&self) -> usize {
        self.dropped_relations
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Chunk> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    /// All chunks in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Chunk> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Relation> {
        self.graph.edge_indices().map(move |idx| &self.graph[idx])
    }

    pub fn edges_of_kind(&self, kind: RelationKind) -> impl Iterator<Item = &Relation> {
        self.edges().filter(move |r| r.kind == kind)
    }

    /// Edges whose endpoints are both in `ids`, in insertion order.
    pub fn edges_within(&self, ids: &HashSet<&str>) -> Vec<&Relation> {
        self.edges()
            .filter(|r| ids.contains(r.from.as_str()) && ids.contains(r.to.as_str()))
            .collect()
    }

    // -- adjacency ----------------------------------------------------------

    /// Distinct successor ids, in the order their first edge was added.
    pub fn successors(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Distinct predecessor ids, in the order their first edge was added.
    pub fn predecessors(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Outgoing edge count, parallel edges included.
    pub fn out_degree(&self, id: &str) -> usize {
        self.degree(id, Direction::Outgoing)
    }

    /// Incoming edge count, parallel edges included.
    pub fn in_degree(&self, id: &str) -> usize {
        self.degree(id, Direction::Incoming)
    }

    /// Every node forward-reachable from `id` by a path of length ≥ 1, excluding `id`.
    pub fn descendants(&self, id: &str) -> HashSet<&str> {
        let mut seen = HashSet::new();
        let Some(&start) = self.index.get(id) else {
            return seen;
        };

        let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for next in self.graph.neighbors_directed(current, Direction::Outgoing) {
                if visited.insert(next) {
                    seen.insert(self.graph[next].id.as_str());
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<&str> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };

        // petgraph walks adjacency newest-first; restore insertion order.
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (e.id(), other)
            })
            .collect();
        edges.sort_by_key(|(edge, _)| *edge);

        let mut seen = HashSet::new();
        edges
            .into_iter()
            .filter(|(_, other)| seen.insert(*other))
            .map(|(_, other)| self.graph[other].id.as_str())
            .collect()
    }

    fn degree(&self, id: &str, direction: Direction) -> usize {
        self.index
            .get(id)
            .map(|&idx| self.graph.edges_directed(idx, direction).count())
            .unwrap_or(0)
    }

    // -- persistence --------------------------------------------------------

    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            version: SNAPSHOT_VERSION,
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
            dropped_relations: self.dropped_relations,
        }
    }

    /// Rebuild a graph from a snapshot. Every edge must reference a node.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(RepoMindError::Snapshot(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }

        let mut graph = Self::new();
        for chunk in snapshot.nodes {
            graph.add_node(chunk);
        }
        for relation in snapshot.edges {
            let (from, to) = (relation.from.clone(), relation.to.clone());
            if !graph.add_edge(relation) {
                return Err(RepoMindError::Snapshot(format!(
                    "edge {from} -> {to} references a missing node"
                )));
            }
        }
        graph.dropped_relations = snapshot.dropped_relations;
        Ok(graph)
    }

    /// Write the snapshot as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.to_snapshot())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let snapshot: GraphSnapshot = serde_json::from_str(&json)?;
        Self::from_snapshot(snapshot)
    }
}

/// Serializable form of a [`CodeGraph`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub version: u32,
    pub nodes: Vec<Chunk>,
    pub edges: Vec<Relation>,
    #[serde(default)]
    pub dropped_relations: usize,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{chunk_id, ChunkKind, Confidence, Language};

    pub(crate) fn node(name: &str) -> Chunk {
        Chunk {
            id: name.to_string(),
            name: name.to_string(),
            kind: ChunkKind::Function,
            language: Language::Python,
            file_path: "app.py".to_string(),
            start_line: 1,
            end_line: 2,
            code_text: format!("def {name}():\n    pass"),
            parameters: Vec::new(),
            decorators: Vec::new(),
        }
    }

    pub(crate) fn call(from: &str, to: &str) -> Relation {
        Relation::new(from, to, RelationKind::Call, Language::Python, Confidence::Syntactic)
    }

    /// Graph over ids named by `nodes` with one call edge per pair.
    pub(crate) fn graph_of(nodes: &[&str], edges: &[(&str, &str)]) -> CodeGraph {
        let mut graph = CodeGraph::new();
        for name in nodes {
            graph.add_node(node(name));
        }
        for (from, to) in edges {
            assert!(graph.add_edge(call(from, to)));
        }
        graph
    }

    #[test]
    fn duplicate_ids_keep_first_node() {
        let mut graph = CodeGraph::new();
        let mut first = node("a");
        first.start_line = 7;
        assert!(graph.add_node(first));
        assert!(!graph.add_node(node("a")));
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.node("a").unwrap().start_line, 7);
    }

    #[test]
    fn edge_requires_both_endpoints() {
        let mut graph = graph_of(&["a"], &[]);
        assert!(!graph.add_edge(call("a", "missing")));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn parallel_edges_are_kept() {
        let graph = graph_of(&["a", "b"], &[("a", "b"), ("a", "b")]);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.out_degree("a"), 2);
        assert_eq!(graph.in_degree("b"), 2);
        assert_eq!(graph.successors("a"), vec!["b"]);
    }

    #[test]
    fn neighbours_follow_insertion_order() {
        let graph = graph_of(
            &["a", "b", "c", "d"],
            &[("a", "c"), ("a", "b"), ("a", "d"), ("b", "d"), ("c", "d")],
        );
        assert_eq!(graph.successors("a"), vec!["c", "b", "d"]);
        assert_eq!(graph.predecessors("d"), vec!["a", "b", "c"]);
        assert!(graph.successors("missing").is_empty());
    }

    #[test]
    fn descendants_exclude_start_even_in_cycle() {
        let graph = graph_of(&["a", "b", "c", "x"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let desc = graph.descendants("a");
        assert_eq!(desc, HashSet::from(["b", "c"]));
        assert!(graph.descendants("x").is_empty());
        assert!(graph.descendants("missing").is_empty());
    }

    #[test]
    fn snapshot_roundtrip_is_isomorphic() {
        let mut graph = graph_of(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "b")]);
        graph.set_dropped_relations(3);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/graph.json");
        graph.save(&path).unwrap();
        let loaded = CodeGraph::load(&path).unwrap();

        assert_eq!(loaded.node_count(), 3);
        assert_eq!(loaded.edge_count(), 3);
        assert_eq!(loaded.dropped_relations(), 3);
        assert_eq!(
            loaded.nodes().collect::<Vec<_>>(),
            graph.nodes().collect::<Vec<_>>()
        );
        assert_eq!(
            loaded.edges().collect::<Vec<_>>(),
            graph.edges().collect::<Vec<_>>()
        );
    }

    #[test]
    fn snapshot_with_dangling_edge_is_rejected() {
        let snapshot = GraphSnapshot {
            version: SNAPSHOT_VERSION,
            nodes: vec![node("a")],
            edges: vec![call("a", &chunk_id("x.py", "gone"))],
            dropped_relations: 0,
        };
        assert!(matches!(
            CodeGraph::from_snapshot(snapshot),
            Err(RepoMindError::Snapshot(_))
        ));
    }

    #[test]
    fn edges_within_filters_by_endpoints() {
        let graph = graph_of(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let ids = HashSet::from(["a", "b"]);
        let inside = graph.edges_within(&ids);
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].to, "b");
    }
}
