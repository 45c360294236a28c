//! Contracts for the collaborators RepoMind hands work to.
//!
//! Handles are built by the caller and passed in explicitly; nothing here
//! keeps global state.

use std::sync::Mutex;

use super::documents::IndexDocument;
use crate::error::{RepoMindError, Result};

/// Similarity search over indexed chunks.
pub trait SemanticSearch: Send + Sync {
    /// Up to `k` chunk ids, most similar first.
    fn search(&self, text: &str, k: usize) -> Result<Vec<String>>;
}

/// Receives one document per chunk after each ingestion.
pub trait DocumentSink: Send + Sync {
    fn accept(&self, documents: &[IndexDocument]) -> Result<()>;
}

/// Fixed candidate list, e.g. ids supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct StaticCandidates {
    ids: Vec<String>,
}

impl StaticCandidates {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids }
    }
}

impl SemanticSearch for StaticCandidates {
    fn search(&self, _text: &str, k: usize) -> Result<Vec<String>> {
        Ok(self.ids.iter().take(k).cloned().collect())
    }
}

/// Collects documents in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    documents: Mutex<Vec<IndexDocument>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> Vec<IndexDocument> {
        self.documents
            .lock()
            .map(|docs| docs.clone())
            .unwrap_or_default()
    }
}

impl DocumentSink for MemorySink {
    fn accept(&self, documents: &[IndexDocument]) -> Result<()> {
        let mut stored = self
            .documents
            .lock()
            .map_err(|_| RepoMindError::Other("document sink lock poisoned".to_string()))?;
        // Each ingestion replaces the previous index.
        *stored = documents.to_vec();
        Ok(())
    }
}
