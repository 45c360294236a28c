//! Collaborator contracts, index documents, payloads and query wiring.

pub mod documents;
pub mod payload;
pub mod query;
pub mod services;

pub use documents::{build_documents, IndexDocument};
pub use payload::{EdgePayload, NodePayload, SubgraphPayload};
pub use query::{FlowReport, ImpactAnalysis, QueryEngine, QuerySettings, StructureReport};
pub use services::{DocumentSink, MemorySink, SemanticSearch, StaticCandidates};
