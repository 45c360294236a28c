//! Graph layer: construction, entry discovery and traversals.

pub mod builder;
pub mod impact;
pub mod ranking;
pub mod search;
pub mod store;
pub mod traversal;

pub use builder::GraphBuilder;
pub use impact::{extract_impact, ExecutionChain, FailurePoint, ImpactOptions, ImpactReport};
pub use ranking::{discover_entries, rank_candidates, RankedEntry};
pub use search::KeywordSearch;
pub use store::{CodeGraph, GraphSnapshot};
pub use traversal::{extract_flow, FlowOptions};
