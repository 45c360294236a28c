//! RepoMind — multi-language code knowledge graph.
//!
//! Extracts chunks and relations from Python, Java and JavaScript/TypeScript
//! sources, infers HTTP bridges between frontend calls and backend route
//! handlers, and answers flow, impact and structure queries over the
//! resulting directed graph.

pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod indexer;
pub mod observability;
pub mod resolution;
pub mod types;
