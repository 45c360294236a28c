//! Flow extraction for the "explain this flow" query.
//!
//! Breadth-first from the entry nodes. Successors form the main execution
//! path; predecessors are only pulled in near the entries, giving shallow
//! caller context without climbing the whole call chain.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::store::CodeGraph;

/// Depth limits for [`extract_flow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowOptions {
    /// Deepest BFS layer emitted, counted from the nearest entry.
    pub max_depth: usize,
    /// Predecessors are expanded only from layers at or above this depth.
    pub helper_depth: usize,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            max_depth: 3,
            helper_depth: 1,
        }
    }
}

/// Node ids in first-visit order. Entries missing from the graph are skipped.
pub fn extract_flow(graph: &CodeGraph, entries: &[String], options: FlowOptions) -> Vec<String> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut ordered = Vec::new();
    let mut queue: VecDeque<(&str, usize)> = entries
        .iter()
        .filter(|id| graph.contains(id))
        .map(|id| (id.as_str(), 0))
        .collect();

    while let Some((node, depth)) = queue.pop_front() {
        if depth > options.max_depth || !visited.insert(node) {
            continue;
        }
        ordered.push(node.to_string());

        if depth == options.max_depth {
            continue;
        }

        for succ in graph.successors(node) {
            if !visited.contains(succ) {
                queue.push_back((succ, depth + 1));
            }
        }

        if depth <= options.helper_depth {
            for pred in graph.predecessors(node) {
                if !visited.contains(pred) {
                    queue.push_back((pred, depth + 1));
                }
            }
        }
    }

    ordered
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::store::tests::graph_of;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn follows_successors_breadth_first() {
        let graph = graph_of(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d")],
        );
        let flow = extract_flow(&graph, &ids(&["a"]), FlowOptions::default());
        assert_eq!(flow, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn stops_at_max_depth() {
        let graph = graph_of(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e")],
        );
        let options = FlowOptions {
            max_depth: 2,
            helper_depth: 0,
        };
        assert_eq!(extract_flow(&graph, &ids(&["a"]), options), vec!["a", "b", "c"]);
    }

    #[test]
    fn predecessors_only_near_entries() {
        // caller -> a -> b -> c, and far_caller -> b.
        let graph = graph_of(
            &["caller", "a", "b", "c", "far_caller"],
            &[("caller", "a"), ("a", "b"), ("b", "c"), ("far_caller", "b")],
        );
        let options = FlowOptions {
            max_depth: 3,
            helper_depth: 0,
        };
        let flow = extract_flow(&graph, &ids(&["a"]), options);
        assert_eq!(flow, vec!["a", "b", "caller", "c"]);
        assert!(!flow.contains(&"far_caller".to_string()));

        let options = FlowOptions {
            max_depth: 3,
            helper_depth: 1,
        };
        let flow = extract_flow(&graph, &ids(&["a"]), options);
        assert!(flow.contains(&"far_caller".to_string()));
    }

    #[test]
    fn never_revisits_in_cycles() {
        let graph = graph_of(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let flow = extract_flow(&graph, &ids(&["a"]), FlowOptions::default());
        assert_eq!(flow, vec!["a", "b", "c"]);
    }

    #[test]
    fn multiple_entries_seed_depth_zero() {
        let graph = graph_of(&["a", "b", "x", "y"], &[("a", "b"), ("x", "y")]);
        let options = FlowOptions {
            max_depth: 1,
            helper_depth: 0,
        };
        let flow = extract_flow(&graph, &ids(&["a", "ghost", "x"]), options);
        assert_eq!(flow, vec!["a", "x", "b", "y"]);
    }

    #[test]
    fn no_entries_gives_empty_flow() {
        let graph = graph_of(&["a"], &[]);
        assert!(extract_flow(&graph, &[], FlowOptions::default()).is_empty());
    }
}
