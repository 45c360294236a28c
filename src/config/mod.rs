//! Configuration from YAML files, environment and CLI overrides.

pub mod loader;
pub mod schema;

pub use loader::{load_config, CliOverrides, PROJECT_CONFIG_FILE};
pub use schema::{BridgeConfig, IngestConfig, RepoMindConfig, RetrievalConfig};
