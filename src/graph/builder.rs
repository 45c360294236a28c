//! Graph construction from extracted chunks and relations.
//!
//! Relation endpoints are raw names. Each is resolved through a name index
//! that remembers every chunk registered under a name in first-seen order;
//! the first one wins. A relation endpoint that already is a chunk id (as
//! bridge relations carry) resolves to that chunk directly. Relations with
//! an unresolved endpoint are dropped.

use std::collections::HashMap;

use tracing::{debug, info};

use super::store::CodeGraph;
use crate::types::{Chunk, Relation};

/// Name → chunk ids, first-registered first.
#[derive(Debug, Default)]
pub struct NameIndex<'c> {
    by_name: HashMap<&'c str, Vec<&'c str>>,
}

impl<'c> NameIndex<'c> {
    pub fn new(chunks: &'c [Chunk]) -> Self {
        let mut by_name: HashMap<&str, Vec<&str>> = HashMap::new();
        for chunk in chunks {
            by_name
                .entry(chunk.name.as_str())
                .or_default()
                .push(chunk.id.as_str());
        }
        Self { by_name }
    }

    /// Every id registered under `name`, in registration order.
    pub fn ids(&self, name: &str) -> &[&'c str] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, name: &str) -> Option<&'c str> {
        self.ids(name).first().copied()
    }
}

/// Builds an immutable [`CodeGraph`] from one ingestion batch.
pub struct GraphBuilder;

impl GraphBuilder {
    pub fn build(chunks: &[Chunk], relations: &[Relation]) -> CodeGraph {
        let names = NameIndex::new(chunks);
        let mut graph = CodeGraph::new();

        let mut duplicate_ids = 0usize;
        for chunk in chunks {
            if !graph.add_node(chunk.clone()) {
                duplicate_ids += 1;
            }
        }
        if duplicate_ids > 0 {
            debug!(duplicate_ids, "kept first chunk for repeated ids");
        }

        let mut dropped = 0usize;
        for relation in relations {
            let resolved = resolve(&graph, &names, &relation.from)
                .zip(resolve(&graph, &names, &relation.to));
            let Some((from, to)) = resolved else {
                dropped += 1;
                continue;
            };

            let mut edge = relation.clone();
            edge.from = from.to_string();
            edge.to = to.to_string();
            graph.add_edge(edge);
        }
        graph.set_dropped_relations(dropped);

        debug!(dropped, "dropped relations with unresolved endpoints");
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built code graph"
        );
        graph
    }
}

fn resolve<'a>(graph: &CodeGraph, names: &NameIndex<'a>, raw: &'a str) -> Option<&'a str> {
    if graph.contains(raw) {
        return Some(raw);
    }
    names.first(raw)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
