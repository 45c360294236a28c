//! Index documents handed to the indexing collaborator.

use serde::{Deserialize, Serialize};

use crate::types::{Chunk, ChunkKind};

/// One searchable document per chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    /// Chunk id; search results refer back to graph nodes through it.
    pub id: String,
    pub file: String,
    /// Chunk name.
    pub title: String,
    pub kind: ChunkKind,
    pub start_line: u32,
    pub end_line: u32,
    pub content: String,
}

impl From<&Chunk> for IndexDocument {
    fn from(chunk: &Chunk) -> Self {
        Self {
            id: chunk.id.clone(),
            file: chunk.file_path.clone(),
            title: chunk.name.clone(),
            kind: chunk.kind,
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            content: chunk.code_text.clone(),
        }
    }
}

/// Documents for a batch of chunks, in chunk order.
pub fn build_documents<'c>(chunks: impl IntoIterator<Item = &'c Chunk>) -> Vec<IndexDocument> {
    chunks.into_iter().map(IndexDocument::from).collect()
}
