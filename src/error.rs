//! Unified error type for RepoMind.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoMindError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tree-sitter error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Graph snapshot error: {0}")]
    Snapshot(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RepoMindError>;
