//! Multi-source config loading with priority merging.
//!
//! Priority order (highest wins):
//!   CLI flags > Environment vars > Project config > User config > Defaults

use std::path::{Path, PathBuf};

use super::schema::RepoMindConfig;
use crate::error::Result;
use crate::types::ChunkKind;

/// Project-level config file name.
pub const PROJECT_CONFIG_FILE: &str = ".repomind.yaml";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Overrides supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub flow_max_depth: Option<usize>,
    pub impact_max_depth: Option<usize>,
    pub candidate_pool: Option<usize>,
}

/// Load configuration from all available sources and merge them.
///
/// Sources (low → high priority):
///   1. Built-in defaults
///   2. User config  (`~/.config/repomind/config.yaml`)
///   3. Project config (`.repomind.yaml` in `project_dir`)
///   4. Environment variables (`REPOMIND_FLOW_MAX_DEPTH`, ...)
///   5. CLI flags
pub fn load_config(cli: &CliOverrides, project_dir: Option<&Path>) -> Result<RepoMindConfig> {
    let mut config = RepoMindConfig::default();

    if let Some(user) = load_user_config() {
        config = merge_configs(config, user);
    }

    if let Some(dir) = project_dir {
        if let Some(project) = load_project_config(dir) {
            config = merge_configs(config, project);
        }
    }

    load_env_overrides(&mut config);

    if let Some(depth) = cli.flow_max_depth {
        config.retrieval.flow_max_depth = depth;
    }
    if let Some(depth) = cli.impact_max_depth {
        config.retrieval.impact_max_depth = depth;
    }
    if let Some(k) = cli.candidate_pool {
        config.retrieval.candidate_pool = k;
    }

    Ok(config)
}

/// Load user config from the platform-specific config directory.
///
/// Returns `None` if the file does not exist or is unparseable.
pub fn load_user_config() -> Option<RepoMindConfig> {
    let path = user_config_path()?;
    load_config_file(&path)
}

/// Load project config from `.repomind.yaml` in the given directory.
///
/// Returns `None` if the file does not exist or is unparseable.
pub fn load_project_config(dir: &Path) -> Option<RepoMindConfig> {
    load_config_file(&dir.join(PROJECT_CONFIG_FILE))
}

/// Apply environment variable overrides to a config in place.
///
/// Supported variables:
/// - `REPOMIND_FLOW_MAX_DEPTH`, `REPOMIND_FLOW_HELPER_DEPTH`,
///   `REPOMIND_IMPACT_MAX_DEPTH`, `REPOMIND_CANDIDATE_POOL`: integers
/// - `REPOMIND_HTTP_CLIENTS`: comma-separated client identifiers
/// - `REPOMIND_NON_CRITICAL_KINDS`: comma-separated chunk kinds
///
/// Values that fail to parse are ignored.
pub fn load_env_overrides(config: &mut RepoMindConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn apply_overrides(config: &mut RepoMindConfig, lookup: impl Fn(&str) -> Option<String>) {
    let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<usize>().ok());

    if let Some(v) = number("REPOMIND_FLOW_MAX_DEPTH") {
        config.retrieval.flow_max_depth = v;
    }
    if let Some(v) = number("REPOMIND_FLOW_HELPER_DEPTH") {
        config.retrieval.flow_helper_depth = v;
    }
    if let Some(v) = number("REPOMIND_IMPACT_MAX_DEPTH") {
        config.retrieval.impact_max_depth = v;
    }
    if let Some(v) = number("REPOMIND_CANDIDATE_POOL") {
        config.retrieval.candidate_pool = v;
    }

    if let Some(val) = lookup("REPOMIND_HTTP_CLIENTS") {
        let clients: Vec<String> = split_list(&val).map(str::to_string).collect();
        if !clients.is_empty() {
            config.bridge.http_clients = clients;
        }
    }

    if let Some(val) = lookup("REPOMIND_NON_CRITICAL_KINDS") {
        config.retrieval.non_critical_kinds =
            split_list(&val).filter_map(ChunkKind::from_str_loose).collect();
    }
}

fn split_list(val: &str) -> impl Iterator<Item = &str> {
    val.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Platform-specific user config path via the `directories` crate.
fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "repomind", "repomind")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
}

/// Try to load and parse a YAML config file. Returns `None` on any error.
fn load_config_file(path: &Path) -> Option<RepoMindConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_yaml::from_str(&contents) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file");
            None
        }
    }
}

/// Merge two configs: `overlay` fields win wherever they differ from the
/// built-in default.
fn merge_configs(mut base: RepoMindConfig, overlay: RepoMindConfig) -> RepoMindConfig {
    let defaults = RepoMindConfig::default();

    macro_rules! take_if_set {
        ($($section:ident . $field:ident),* $(,)?) => {
            $(
                if overlay.$section.$field != defaults.$section.$field {
                    base.$section.$field = overlay.$section.$field.clone();
                }
            )*
        };
    }

    if overlay.version != defaults.version {
        base.version = overlay.version.clone();
    }

    take_if_set!(
        ingest.ignored_dirs,
        ingest.ignored_extensions,
        ingest.ignored_files,
        ingest.max_file_size,
        ingest.parallel,
        bridge.http_clients,
        bridge.fetch_method_window,
        bridge.route_methods_window,
        retrieval.candidate_pool,
        retrieval.explain_entries,
        retrieval.structure_entries,
        retrieval.impact_entries,
        retrieval.flow_max_depth,
        retrieval.flow_helper_depth,
        retrieval.impact_max_depth,
        retrieval.non_critical_kinds,
    );

    base
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_project_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join(PROJECT_CONFIG_FILE)).unwrap();
        writeln!(f, "retrieval:\n  flow_max_depth: 6\nbridge:\n  http_clients: [http]").unwrap();

        let config = load_project_config(dir.path()).unwrap();
        assert_eq!(config.retrieval.flow_max_depth, 6);
        assert_eq!(config.bridge.http_clients, vec!["http"]);
    }

    #[test]
    fn test_missing_project_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_project_config(dir.path()).is_none());
    }

    #[test]
    fn test_invalid_project_config_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_CONFIG_FILE), "{{invalid yaml}}").unwrap();
        assert!(load_project_config(dir.path()).is_none());
    }

    #[test]
    fn test_cli_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "retrieval:\n  flow_max_depth: 6\n  impact_max_depth: 2\n",
        )
        .unwrap();

        let cli = CliOverrides {
            flow_max_depth: Some(9),
            ..Default::default()
        };
        let config = load_config(&cli, Some(dir.path())).unwrap();
        assert_eq!(config.retrieval.flow_max_depth, 9);
        assert_eq!(config.retrieval.impact_max_depth, 2);
    }

    #[test]
    fn test_merge_keeps_base_where_overlay_is_default() {
        let mut base = RepoMindConfig::default();
        base.retrieval.candidate_pool = 20;
        let mut overlay = RepoMindConfig::default();
        overlay.retrieval.flow_max_depth = 5;

        let merged = merge_configs(base, overlay);
        assert_eq!(merged.retrieval.candidate_pool, 20);
        assert_eq!(merged.retrieval.flow_max_depth, 5);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RepoMindConfig::default();
        apply_overrides(
            &mut config,
            lookup_from(&[
                ("REPOMIND_FLOW_MAX_DEPTH", "4"),
                ("REPOMIND_IMPACT_MAX_DEPTH", "not-a-number"),
                ("REPOMIND_HTTP_CLIENTS", "http, api ,"),
                ("REPOMIND_NON_CRITICAL_KINDS", "constructor,utility,static_method"),
            ]),
        );
        assert_eq!(config.retrieval.flow_max_depth, 4);
        assert_eq!(config.retrieval.impact_max_depth, 4);
        assert_eq!(config.bridge.http_clients, vec!["http", "api"]);
        assert_eq!(
            config.retrieval.non_critical_kinds,
            vec![ChunkKind::Constructor, ChunkKind::StaticMethod]
        );
    }

    #[test]
    fn test_empty_client_list_is_ignored() {
        let mut config = RepoMindConfig::default();
        apply_overrides(&mut config, lookup_from(&[("REPOMIND_HTTP_CLIENTS", " , ")]));
        assert_eq!(config.bridge.http_clients, vec!["axios", "apiClient"]);
    }
}
