//! Offline keyword search over graph nodes.
//!
//! A deterministic stand-in for an embedding index: query and chunk text
//! are split into lower-case identifier tokens (`getUserById` →
//! `get user by id`), and chunks are scored by token overlap. Name hits
//! weigh three times as much as hits in the body.

use std::collections::HashSet;

use crate::context::services::SemanticSearch;
use crate::error::Result;
use crate::graph::store::CodeGraph;

const NAME_WEIGHT: usize = 3;
const CODE_WEIGHT: usize = 1;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "how", "what", "does", "this", "that", "with", "from", "into", "when",
    "why", "work", "works", "show", "explain", "change", "changes", "if", "is", "it", "of", "to",
    "in", "on", "an", "a", "i", "me", "my", "breaks", "break",
];

struct IndexedNode {
    id: String,
    name_tokens: HashSet<String>,
    code_tokens: HashSet<String>,
}

/// Token-overlap search built from a graph's chunks.
pub struct KeywordSearch {
    nodes: Vec<IndexedNode>,
}

impl KeywordSearch {
    pub fn new(graph: &CodeGraph) -> Self {
        let nodes = graph
            .nodes()
            .map(|chunk| IndexedNode {
                id: chunk.id.clone(),
                name_tokens: tokenize(&chunk.name).into_iter().collect(),
                code_tokens: tokenize(&chunk.code_text).into_iter().collect(),
            })
            .collect();
        Self { nodes }
    }

    /// Scored ids, best first; ties keep graph insertion order.
    pub fn scored(&self, text: &str) -> Vec<(String, usize)> {
        let mut query: Vec<String> = Vec::new();
        for token in tokenize(text) {
            if !query.contains(&token) {
                query.push(token);
            }
        }
        if query.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(String, usize)> = self
            .nodes
            .iter()
            .filter_map(|node| {
                let score: usize = query
                    .iter()
                    .map(|t| {
                        let mut s = 0;
                        if node.name_tokens.contains(t) {
                            s += NAME_WEIGHT;
                        }
                        if node.code_tokens.contains(t) {
                            s += CODE_WEIGHT;
                        }
                        s
                    })
                    .sum();
                (score > 0).then(|| (node.id.clone(), score))
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored
    }
}

impl SemanticSearch for KeywordSearch {
    fn search(&self, text: &str, k: usize) -> Result<Vec<String>> {
        Ok(self
            .scored(text)
            .into_iter()
            .take(k)
            .map(|(id, _)| id)
            .collect())
    }
}

/// Split into lower-case identifier words, dropping stopwords and 1-char tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        for part in split_camel(word) {
            let lower = part.to_lowercase();
            if lower.chars().count() > 1 && !STOPWORDS.contains(&lower.as_str()) {
                tokens.push(lower);
            }
        }
    }
    tokens
}

/// `getHTTPResponse` → `get`, `HTTP`, `Response`.
fn split_camel(word: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = word.char_indices().collect();
    let mut parts = Vec::new();
    let mut start = 0;
    for i in 1..chars.len() {
        let (idx, c) = chars[i];
        let prev = chars[i - 1].1;
        let next_lower = chars.get(i + 1).is_some_and(|(_, n)| n.is_lowercase());
        let boundary = (c.is_uppercase() && (prev.is_lowercase() || prev.is_ascii_digit()))
            || (c.is_uppercase() && prev.is_uppercase() && next_lower);
        if boundary {
            parts.push(&word[start..idx]);
            start = idx;
        }
    }
    if start < word.len() {
        parts.push(&word[start..]);
    }
    parts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
