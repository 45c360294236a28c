//! Impact extraction for the "what breaks if this changes" query.
//!
//! For each start node a breadth-first walk records every node's level and
//! path. The first node reached that is not the start, has no outgoing
//! edges and is not of a non-critical kind is the start's failure point;
//! the walk for that start ends there.

use std::collections::{BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::store::CodeGraph;
use crate::types::ChunkKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactOptions {
    pub max_depth: usize,
    /// Dead ends of these kinds are never reported as failures.
    #[serde(default)]
    pub non_critical_kinds: Vec<ChunkKind>,
}

impl Default for ImpactOptions {
    fn default() -> Self {
        Self {
            max_depth: 4,
            non_critical_kinds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeLevel {
    pub id: String,
    pub level: usize,
}

/// Where execution from an entry is expected to stop working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailurePoint {
    pub entry: String,
    /// Last node on the path that still works.
    pub safe_until: String,
    pub fails_at: String,
    pub path: Vec<String>,
    /// Level of `safe_until`.
    pub working_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionChain {
    pub entry: String,
    /// Visited nodes strictly above the failure's level, or all visited nodes.
    pub working_nodes: Vec<String>,
    pub first_failure: Option<String>,
    pub failure_path: Vec<String>,
    /// Visit order with levels.
    pub levels: Vec<NodeLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImpactReport {
    pub start_nodes: Vec<String>,
    /// Sorted union of every visited node.
    pub impacted_nodes: Vec<String>,
    pub execution_chains: Vec<ExecutionChain>,
    pub failure_points: Vec<FailurePoint>,
}

impl ImpactReport {
    pub fn is_empty(&self) -> bool {
        self.impacted_nodes.is_empty()
    }
}

/// Analyse every start node; starts missing from the graph are skipped.
pub fn extract_impact(graph: &CodeGraph, starts: &[String], options: &ImpactOptions) -> ImpactReport {
    let mut impacted: BTreeSet<String> = BTreeSet::new();
    let mut report = ImpactReport {
        start_nodes: starts.to_vec(),
        ..ImpactReport::default()
    };

    for start in starts.iter().filter(|s| graph.contains(s)) {
        let (chain, failure) = walk(graph, start, options);
        impacted.extend(chain.levels.iter().map(|l| l.id.clone()));
        report.execution_chains.push(chain);
        report.failure_points.extend(failure);
    }

    report.impacted_nodes = impacted.into_iter().collect();
    report
}

fn walk(graph: &CodeGraph, start: &str, options: &ImpactOptions) -> (ExecutionChain, Option<FailurePoint>) {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut levels: Vec<NodeLevel> = Vec::new();
    let mut failure: Option<(Vec<String>, usize)> = None;
    let mut queue: VecDeque<(&str, usize, Vec<&str>)> = VecDeque::from([(start, 0, vec![start])]);

    while let Some((node, level, path)) = queue.pop_front() {
        if level > options.max_depth || !visited.insert(node) {
            continue;
        }
        levels.push(NodeLevel {
            id: node.to_string(),
            level,
        });

        let successors = graph.successors(node);
        if node != start && successors.is_empty() && !is_non_critical(graph, node, options) {
            failure = Some((path.iter().map(|s| s.to_string()).collect(), level));
            break;
        }

        for succ in successors {
            let mut next = path.clone();
            next.push(succ);
            queue.push_back((succ, level + 1, next));
        }
    }

    let level_of = |id: &str| levels.iter().find(|l| l.id == id).map(|l| l.level);

    let (first_failure, failure_path, failure_point, failure_level) = match failure {
        Some((path, level)) => {
            let fails_at = path.last().cloned().unwrap_or_default();
            let safe_until = if path.len() > 1 {
                path[path.len() - 2].clone()
            } else {
                start.to_string()
            };
            let point = FailurePoint {
                entry: start.to_string(),
                working_depth: level_of(&safe_until).unwrap_or(0),
                safe_until,
                fails_at: fails_at.clone(),
                path: path.clone(),
            };
            (Some(fails_at), path, Some(point), Some(level))
        }
        None => (None, Vec::new(), None, None),
    };

    let working_nodes = levels
        .iter()
        .filter(|l| failure_level.map_or(true, |fl| l.level < fl))
        .map(|l| l.id.clone())
        .collect();

    let chain = ExecutionChain {
        entry: start.to_string(),
        working_nodes,
        first_failure,
        failure_path,
        levels,
    };
    (chain, failure_point)
}

fn is_non_critical(graph: &CodeGraph, id: &str, options: &ImpactOptions) -> bool {
    graph
        .node(id)
        .is_some_and(|chunk| options.non_critical_kinds.contains(&chunk.kind))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::store::tests::{call, node};
    use crate::graph::store::tests::graph_of;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn linear_chain_fails_at_dead_end() {
        let graph = graph_of(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let report = extract_impact(&graph, &ids(&["A"]), &ImpactOptions::default());

        assert_eq!(report.impacted_nodes, ids(&["A", "B", "C"]));
        assert_eq!(report.failure_points.len(), 1);
        let failure = &report.failure_points[0];
        assert_eq!(failure.fails_at, "C");
        assert_eq!(failure.safe_until, "B");
        assert_eq!(failure.path, ids(&["A", "B", "C"]));
        assert_eq!(failure.working_depth, 1);

        let chain = &report.execution_chains[0];
        assert_eq!(chain.first_failure.as_deref(), Some("C"));
        assert_eq!(chain.working_nodes, ids(&["A", "B"]));
        assert_eq!(chain.levels.len(), 3);
        assert_eq!(chain.levels[2], NodeLevel { id: "C".to_string(), level: 2 });
    }

    #[test]
    fn cycle_without_dead_end_has_no_failure() {
        let graph = graph_of(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        let report = extract_impact(&graph, &ids(&["A"]), &ImpactOptions::default());

        assert!(report.failure_points.is_empty());
        assert_eq!(report.impacted_nodes, ids(&["A", "B", "C"]));
        let chain = &report.execution_chains[0];
        assert_eq!(chain.first_failure, None);
        assert_eq!(chain.working_nodes, ids(&["A", "B", "C"]));
    }

    #[test]
    fn direct_successor_failure_is_safe_at_start() {
        let graph = graph_of(&["A", "B"], &[("A", "B")]);
        let report = extract_impact(&graph, &ids(&["A"]), &ImpactOptions::default());
        let failure = &report.failure_points[0];
        assert_eq!(failure.safe_until, "A");
        assert_eq!(failure.working_depth, 0);
    }

    #[test]
    fn isolated_start_is_not_its_own_failure() {
        let graph = graph_of(&["A"], &[]);
        let report = extract_impact(&graph, &ids(&["A"]), &ImpactOptions::default());
        assert!(report.failure_points.is_empty());
        assert_eq!(report.impacted_nodes, ids(&["A"]));
    }

    #[test]
    fn non_critical_dead_ends_are_skipped() {
        let mut graph = CodeGraph::new();
        graph.add_node(node("A"));
        let mut helper = node("H");
        helper.kind = ChunkKind::StaticMethod;
        graph.add_node(helper);
        graph.add_node(node("B"));
        graph.add_node(node("C"));
        for (from, to) in [("A", "H"), ("A", "B"), ("B", "C")] {
            graph.add_edge(call(from, to));
        }

        let options = ImpactOptions {
            non_critical_kinds: vec![ChunkKind::StaticMethod],
            ..ImpactOptions::default()
        };
        let report = extract_impact(&graph, &ids(&["A"]), &options);
        assert_eq!(report.failure_points[0].fails_at, "C");

        let report = extract_impact(&graph, &ids(&["A"]), &ImpactOptions::default());
        assert_eq!(report.failure_points[0].fails_at, "H");
        // B shares H's level and was never dequeued.
        assert_eq!(report.execution_chains[0].working_nodes, ids(&["A"]));
    }

    #[test]
    fn max_depth_bounds_reachable_set() {
        let graph = graph_of(
            &["A", "B", "C", "D"],
            &[("A", "B"), ("B", "C"), ("C", "D"), ("D", "A")],
        );
        let options = ImpactOptions {
            max_depth: 1,
            ..ImpactOptions::default()
        };
        let report = extract_impact(&graph, &ids(&["A"]), &options);
        assert_eq!(report.impacted_nodes, ids(&["A", "B"]));
        assert!(report.failure_points.is_empty());
    }

    #[test]
    fn unions_over_starts_and_skips_missing() {
        let graph = graph_of(&["A", "B", "X", "Y"], &[("A", "B"), ("X", "Y")]);
        let report = extract_impact(&graph, &ids(&["X", "ghost", "A"]), &ImpactOptions::default());
        assert_eq!(report.start_nodes, ids(&["X", "ghost", "A"]));
        assert_eq!(report.impacted_nodes, ids(&["A", "B", "X", "Y"]));
        assert_eq!(report.execution_chains.len(), 2);
        assert_eq!(report.execution_chains[0].entry, "X");
        assert_eq!(report.failure_points.len(), 2);
    }
}
