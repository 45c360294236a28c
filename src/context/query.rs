//! Query engine for the three query shapes.
//!
//! | Query       | Entries | Traversal         | Payload nodes        |
//! |-------------|---------|-------------------|----------------------|
//! | `explain`   | 3       | flow (BFS)        | flow order           |
//! | `impact`    | 1       | impact (BFS)      | impacted set         |
//! | `structure` | 3       | none              | entry nodes          |
//!
//! Every query asks the injected [`SemanticSearch`] for candidates, ranks
//! them with entry discovery and runs the traversal over the shared,
//! read-only graph. No entries means an empty report, not an error.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::payload::SubgraphPayload;
use super::services::SemanticSearch;
use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::graph::impact::{extract_impact, ImpactOptions, ImpactReport};
use crate::graph::ranking::{rank_candidates, RankedEntry};
use crate::graph::store::CodeGraph;
use crate::graph::traversal::{extract_flow, FlowOptions};

/// Limits applied by [`QueryEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySettings {
    pub candidate_pool: usize,
    pub explain_entries: usize,
    pub structure_entries: usize,
    pub impact_entries: usize,
    pub flow: FlowOptions,
    pub impact: ImpactOptions,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for QuerySettings {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            candidate_pool: config.candidate_pool,
            explain_entries: config.explain_entries,
            structure_entries: config.structure_entries,
            impact_entries: config.impact_entries,
            flow: FlowOptions {
                max_depth: config.flow_max_depth,
                helper_depth: config.flow_helper_depth,
            },
            impact: ImpactOptions {
                max_depth: config.impact_max_depth,
                non_critical_kinds: config.non_critical_kinds.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowReport {
    pub query: String,
    pub entries: Vec<RankedEntry>,
    /// Node ids in discovery order.
    pub flow: Vec<String>,
    pub payload: SubgraphPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpactAnalysis {
    pub query: String,
    pub entries: Vec<RankedEntry>,
    pub report: ImpactReport,
    pub payload: SubgraphPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructureReport {
    pub query: String,
    pub entries: Vec<RankedEntry>,
    pub payload: SubgraphPayload,
}

pub struct QueryEngine {
    graph: Arc<CodeGraph>,
    search: Arc<dyn SemanticSearch>,
    settings: QuerySettings,
}

impl QueryEngine {
    pub fn new(graph: Arc<CodeGraph>, search: Arc<dyn SemanticSearch>, settings: QuerySettings) -> Self {
        Self {
            graph,
            search,
            settings,
        }
    }

    pub fn graph(&self) -> &CodeGraph {
        &self.graph
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// Ranked entry nodes for `query`, at most `limit`.
    pub fn discover(&self, query: &str, limit: usize) -> Result<Vec<RankedEntry>> {
        let candidates = self.search.search(query, self.settings.candidate_pool)?;
        debug!(candidates = candidates.len(), "semantic candidates");

        let mut ranked = rank_candidates(&self.graph, &candidates);
        ranked.truncate(limit);
        info!(query, entries = ranked.len(), "entry discovery");
        Ok(ranked)
    }

    pub fn explain(&self, query: &str) -> Result<FlowReport> {
        let entries = self.discover(query, self.settings.explain_entries)?;
        let flow = extract_flow(&self.graph, &entry_ids(&entries), self.settings.flow);
        let payload = SubgraphPayload::from_ids(&self.graph, &flow);
        Ok(FlowReport {
            query: query.to_string(),
            entries,
            flow,
            payload,
        })
    }

    pub fn impact(&self, query: &str) -> Result<ImpactAnalysis> {
        let entries = self.discover(query, self.settings.impact_entries)?;
        let report = extract_impact(&self.graph, &entry_ids(&entries), &self.settings.impact);
        let payload = SubgraphPayload::from_ids(&self.graph, &report.impacted_nodes);
        Ok(ImpactAnalysis {
            query: query.to_string(),
            entries,
            report,
            payload,
        })
    }

    pub fn structure(&self, query: &str) -> Result<StructureReport> {
        let entries = self.discover(query, self.settings.structure_entries)?;
        let payload = SubgraphPayload::from_ids(&self.graph, &entry_ids(&entries));
        Ok(StructureReport {
            query: query.to_string(),
            entries,
            payload,
        })
    }
}

fn entry_ids(entries: &[RankedEntry]) -> Vec<String> {
    entries.iter().map(|e| e.id.clone()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
