//! Entry discovery.
//!
//! Ranks candidate node ids (typically from a semantic search) by how much
//! of the graph they lead into:
//!
//! ```text
//! score = 2 × out_degree + |descendants| − in_degree
//! ```
//!
//! Nodes that fan out into large downstream subgraphs rank above widely
//! reused low-level helpers.

use std::collections::HashSet;

use serde::Serialize;

use super::store::CodeGraph;

/// A candidate with its score and the terms it was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub id: String,
    pub score: i64,
    pub out_degree: usize,
    pub in_degree: usize,
    pub descendants: usize,
}

/// Score every distinct candidate present in the graph, best first.
///
/// Candidates missing from the graph are discarded. Equal scores keep
/// first-seen order.
pub fn rank_candidates(graph: &CodeGraph, candidates: &[String]) -> Vec<RankedEntry> {
    let mut seen = HashSet::new();
    let mut ranked: Vec<RankedEntry> = candidates
        .iter()
        .filter(|id| graph.contains(id) && seen.insert(id.as_str()))
        .map(|id| {
            let out_degree = graph.out_degree(id);
            let in_degree = graph.in_degree(id);
            let descendants = graph.descendants(id).len();
            RankedEntry {
                id: id.clone(),
                score: 2 * out_degree as i64 + descendants as i64 - in_degree as i64,
                out_degree,
                in_degree,
                descendants,
            }
        })
        .collect();

    // Stable: ties stay in candidate order.
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

/// The top `limit` entry node ids; empty when no candidate resolves.
pub fn discover_entries(graph: &CodeGraph, candidates: &[String], limit: usize) -> Vec<String> {
    rank_candidates(graph, candidates)
        .into_iter()
        .take(limit)
        .map(|entry| entry.id)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
