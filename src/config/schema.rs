//! Configuration data structures for RepoMind.
//!
//! Defines the YAML config format: ingestion filters, bridge inference
//! knobs and retrieval depths. Every field has a serde default so partial
//! files are valid.

use serde::{Deserialize, Serialize};

use crate::types::ChunkKind;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for RepoMind.
///
/// Loaded from YAML files, environment variables, and CLI flags.
/// Multiple sources are merged with well-defined priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoMindConfig {
    /// Config format version (currently "1.0").
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub bridge: BridgeConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl Default for RepoMindConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            ingest: IngestConfig::default(),
            bridge: BridgeConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// IngestConfig
// ---------------------------------------------------------------------------

/// Which files of a source tree reach the extractors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory names pruned anywhere in the tree.
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,

    /// Lower-case extensions (with dot) that are never read.
    #[serde(default = "default_ignored_extensions")]
    pub ignored_extensions: Vec<String>,

    /// Exact file names that are never read.
    #[serde(default = "default_ignored_files")]
    pub ignored_files: Vec<String>,

    /// Files larger than this many bytes are skipped.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Extract files on the rayon pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            ignored_dirs: default_ignored_dirs(),
            ignored_extensions: default_ignored_extensions(),
            ignored_files: default_ignored_files(),
            max_file_size: default_max_file_size(),
            parallel: true,
        }
    }
}

// ---------------------------------------------------------------------------
// BridgeConfig
// ---------------------------------------------------------------------------

/// Knobs for frontend → backend HTTP bridge inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Identifiers recognised as HTTP clients in `<client>.<verb>(route)`.
    #[serde(default = "default_http_clients")]
    pub http_clients: Vec<String>,

    /// Characters after a `fetch(...)` route searched for `method: '...'`.
    #[serde(default = "default_fetch_method_window")]
    pub fetch_method_window: usize,

    /// Characters after a generic route registration searched for `methods=[...]`.
    #[serde(default = "default_route_methods_window")]
    pub route_methods_window: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            http_clients: default_http_clients(),
            fetch_method_window: default_fetch_method_window(),
            route_methods_window: default_route_methods_window(),
        }
    }
}

// ---------------------------------------------------------------------------
// RetrievalConfig
// ---------------------------------------------------------------------------

/// Entry discovery and traversal parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates requested from semantic search (K).
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,

    #[serde(default = "default_three")]
    pub explain_entries: usize,

    #[serde(default = "default_three")]
    pub structure_entries: usize,

    #[serde(default = "default_one")]
    pub impact_entries: usize,

    #[serde(default = "default_flow_max_depth")]
    pub flow_max_depth: usize,

    #[serde(default = "default_one")]
    pub flow_helper_depth: usize,

    #[serde(default = "default_impact_max_depth")]
    pub impact_max_depth: usize,

    /// Kinds never reported as an impact failure point.
    #[serde(default)]
    pub non_critical_kinds: Vec<ChunkKind>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_pool: default_candidate_pool(),
            explain_entries: 3,
            structure_entries: 3,
            impact_entries: 1,
            flow_max_depth: default_flow_max_depth(),
            flow_helper_depth: 1,
            impact_max_depth: default_impact_max_depth(),
            non_critical_kinds: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_version() -> String {
    "1.0".to_string()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_ignored_dirs() -> Vec<String> {
    strings(&[
        ".git",
        "venv",
        "__pycache__",
        "node_modules",
        "dist",
        "build",
        ".cache",
    ])
}

fn default_ignored_extensions() -> Vec<String> {
    strings(&[
        ".png", ".jpg", ".jpeg", ".gif", ".svg", ".mp3", ".mp4", ".wav", ".pdf", ".zip", ".exe",
        ".bin", ".env", ".lock", ".log", ".csv",
    ])
}

fn default_ignored_files() -> Vec<String> {
    strings(&[".gitignore", "__init__.py"])
}

fn default_max_file_size() -> u64 {
    2 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_http_clients() -> Vec<String> {
    strings(&["axios", "apiClient"])
}

fn default_fetch_method_window() -> usize {
    500
}

fn default_route_methods_window() -> usize {
    300
}

fn default_candidate_pool() -> usize {
    10
}

fn default_one() -> usize {
    1
}

fn default_three() -> usize {
    3
}

fn default_flow_max_depth() -> usize {
    3
}

fn default_impact_max_depth() -> usize {
    4
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
