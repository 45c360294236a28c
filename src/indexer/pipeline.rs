//! Ingestion pipeline: source tree to code graph.
//!
//! 1. **Collect**: walk the tree with `ignore` (gitignore-aware), apply the
//!    configured filters, read UTF-8 sources in a stable order.
//! 2. **Extract**: run the per-language extractors. Files are independent,
//!    so this runs on rayon; results keep input order.
//! 3. **Bridge**: infer frontend → backend `http_call` relations over the
//!    whole batch.
//! 4. **Build**: resolve every relation into one immutable [`CodeGraph`]
//!    and produce the index documents.
//!
//! A new ingestion always yields a fresh graph; nothing is patched in place.

use std::fs;
use std::path::Path;
use std::time::Instant;

use ignore::WalkBuilder;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{IngestConfig, RepoMindConfig};
use crate::context::documents::{build_documents, IndexDocument};
use crate::error::Result;
use crate::graph::builder::GraphBuilder;
use crate::graph::store::CodeGraph;
use crate::indexer::extractor::ExtractorRegistry;
use crate::resolution::bridge::BridgeInferencer;
use crate::types::{FileExtraction, Language, SourceFile};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct IngestionSummary {
    pub files: usize,
    pub failed_files: usize,
    pub chunks: usize,
    pub relations: usize,
    pub bridges: usize,
    pub nodes: usize,
    pub edges: usize,
    pub dropped_relations: usize,
    pub duration_ms: u128,
}

impl std::fmt::Display for IngestionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Ingested {} files ({} failed): {} chunks, {} relations, {} bridges -> {} nodes, {} edges ({} dropped) in {}ms",
            self.files,
            self.failed_files,
            self.chunks,
            self.relations,
            self.bridges,
            self.nodes,
            self.edges,
            self.dropped_relations,
            self.duration_ms,
        )
    }
}

/// Everything one ingestion run produces.
#[derive(Debug)]
pub struct Ingestion {
    pub graph: CodeGraph,
    pub documents: Vec<IndexDocument>,
    pub summary: IngestionSummary,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct IngestionPipeline {
    registry: ExtractorRegistry,
    bridges: BridgeInferencer,
    parallel: bool,
}

impl IngestionPipeline {
    pub fn new(config: &RepoMindConfig) -> Result<Self> {
        Self::with_registry(ExtractorRegistry::default(), config)
    }

    pub fn with_registry(registry: ExtractorRegistry, config: &RepoMindConfig) -> Result<Self> {
        Ok(Self {
            registry,
            bridges: BridgeInferencer::new(&config.bridge)?,
            parallel: config.ingest.parallel,
        })
    }

    /// Collect and ingest every supported file under `root`.
    pub fn ingest_dir(&self, root: &Path, config: &IngestConfig) -> Result<Ingestion> {
        let sources = collect_sources(root, config)?;
        Ok(self.ingest(&sources))
    }

    /// Build a graph from already-loaded sources.
    pub fn ingest(&self, sources: &[SourceFile]) -> Ingestion {
        let start = Instant::now();

        let extract = |file: &SourceFile| -> (FileExtraction, bool) {
            match self.registry.try_extract(file) {
                Ok(extraction) => (extraction, false),
                Err(e) => {
                    warn!(path = %file.path, error = %e, "skipping unparseable file");
                    (FileExtraction::default(), true)
                }
            }
        };

        // ---- Extract (per file, order preserved) ----
        let results: Vec<(FileExtraction, bool)> = if self.parallel {
            sources.par_iter().map(extract).collect()
        } else {
            sources.iter().map(extract).collect()
        };

        let failed_files = results.iter().filter(|(_, failed)| *failed).count();
        let mut chunks = Vec::new();
        let mut relations = Vec::new();
        for (extraction, _) in results {
            chunks.extend(extraction.chunks);
            relations.extend(extraction.relations);
        }
        let raw_relations = relations.len();
        debug!(chunks = chunks.len(), relations = raw_relations, "extraction done");

        // ---- Bridge ----
        let bridges = self.bridges.infer(&chunks);
        let bridge_count = bridges.len();
        relations.extend(bridges);

        // ---- Build ----
        let graph = GraphBuilder::build(&chunks, &relations);
        let documents = build_documents(&chunks);

        let summary = IngestionSummary {
            files: sources.len(),
            failed_files,
            chunks: chunks.len(),
            relations: raw_relations,
            bridges: bridge_count,
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            dropped_relations: graph.dropped_relations(),
            duration_ms: start.elapsed().as_millis(),
        };
        info!("{summary}");

        Ingestion {
            graph,
            documents,
            summary,
        }
    }
}

// ---------------------------------------------------------------------------
// Source collection (using the `ignore` crate for gitignore awareness)
// ---------------------------------------------------------------------------

/// Read every supported, non-ignored source file under `root`.
///
/// Paths are relative to `root` with `/` separators; the result is sorted
/// by path. Oversized and non-UTF-8 files are skipped.
pub fn collect_sources(root: &Path, config: &IngestConfig) -> Result<Vec<SourceFile>> {
    let ignored_dirs = config.ignored_dirs.clone();
    let walker = WalkBuilder::new(root)
        .standard_filters(true) // respects .gitignore, .ignore, hidden files
        .require_git(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir && ignored_dirs.iter().any(|d| entry.file_name() == d.as_str()))
        })
        .build();

    let mut sources = Vec::new();
    for entry in walker.flatten() {
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        if is_ignored_file(path, config) {
            continue;
        }
        let Some(language) = Language::from_path(path) else {
            continue;
        };

        let size = fs::metadata(path)?.len();
        if size > config.max_file_size {
            debug!(path = %path.display(), size, "skipping oversized file");
            continue;
        }

        let Ok(content) = fs::read_to_string(path) else {
            debug!(path = %path.display(), "skipping non-UTF-8 file");
            continue;
        };

        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        sources.push(SourceFile::new(relative, content, language));
    }

    sources.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(files = sources.len(), root = %root.display(), "collected sources");
    Ok(sources)
}

fn is_ignored_file(path: &Path, config: &IngestConfig) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    if config.ignored_files.iter().any(|f| *f == name) {
        return true;
    }
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    !ext.is_empty() && config.ignored_extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RelationKind;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn setup_project() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(
            root,
            "api/views.py",
            "from flask import Flask\n\napp = Flask(__name__)\n\n@app.get('/users')\ndef list_users():\n    return load_users()\n\ndef load_users():\n    return []\n",
        );
        write(
            root,
            "web/src/users.ts",
            "export async function fetchUsers() {\n  const res = await fetch('/users', { method: 'GET' });\n  return res.json();\n}\n",
        );
        write(root, "api/__init__.py", "");
        write(root, "node_modules/lib/index.js", "function hidden() {}\n");
        write(root, "notes.txt", "not code");
        write(root, "logo.png", "binary-ish");
        tmp
    }

    #[test]
    fn collect_sources_applies_filters() {
        let tmp = setup_project();
        let sources = collect_sources(tmp.path(), &IngestConfig::default()).unwrap();
        let paths: Vec<&str> = sources.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["api/views.py", "web/src/users.ts"]);
        assert_eq!(sources[0].language, Language::Python);
        assert_eq!(sources[1].language, Language::TypeScript);
    }

    #[test]
    fn collect_sources_respects_size_limit() {
        let tmp = setup_project();
        let config = IngestConfig {
            max_file_size: 10,
            ..IngestConfig::default()
        };
        assert!(collect_sources(tmp.path(), &config).unwrap().is_empty());
    }

    #[test]
    fn collect_sources_respects_gitignore() {
        let tmp = setup_project();
        write(tmp.path(), ".gitignore", "web/\n");
        let sources = collect_sources(tmp.path(), &IngestConfig::default()).unwrap();
        assert!(sources.iter().all(|s| !s.path.starts_with("web/")));
    }

    #[test]
    fn ingest_builds_graph_with_bridge() {
        let tmp = setup_project();
        let pipeline = IngestionPipeline::new(&RepoMindConfig::default()).unwrap();
        let ingestion = pipeline.ingest_dir(tmp.path(), &IngestConfig::default()).unwrap();

        let summary = &ingestion.summary;
        assert_eq!(summary.files, 2);
        assert_eq!(summary.failed_files, 0);
        assert_eq!(summary.bridges, 1);
        assert_eq!(summary.nodes, ingestion.graph.node_count());
        assert_eq!(ingestion.documents.len(), summary.chunks);

        let graph = &ingestion.graph;
        assert!(graph.contains("api/views.py::list_users"));
        assert_eq!(
            graph.successors("api/views.py::list_users"),
            vec!["api/views.py::load_users"]
        );

        let bridge = graph.edges_of_kind(RelationKind::HttpCall).next().unwrap();
        assert_eq!(bridge.from, "web/src/users.ts::fetchUsers");
        assert_eq!(bridge.to, "api/views.py::list_users");
        assert_eq!(bridge.language_label(), "cross");
    }

    #[test]
    fn malformed_file_is_isolated() {
        let sources = vec![
            SourceFile::new("bad.py", "def broken(:\n    pass\n", Language::Python),
            SourceFile::new("good.py", "def fine():\n    return 1\n", Language::Python),
        ];
        let pipeline = IngestionPipeline::new(&RepoMindConfig::default()).unwrap();
        let ingestion = pipeline.ingest(&sources);

        assert_eq!(ingestion.summary.failed_files, 1);
        assert!(ingestion.graph.contains("good.py::fine"));
        assert!(ingestion.graph.nodes().all(|c| c.file_path != "bad.py"));
    }

    #[test]
    fn sequential_and_parallel_runs_agree() {
        let tmp = setup_project();
        let sources = collect_sources(tmp.path(), &IngestConfig::default()).unwrap();

        let parallel = IngestionPipeline::new(&RepoMindConfig::default()).unwrap();
        let mut config = RepoMindConfig::default();
        config.ingest.parallel = false;
        let sequential = IngestionPipeline::new(&config).unwrap();

        let a = parallel.ingest(&sources);
        let b = sequential.ingest(&sources);
        assert_eq!(a.graph.nodes().collect::<Vec<_>>(), b.graph.nodes().collect::<Vec<_>>());
        assert_eq!(a.graph.edges().collect::<Vec<_>>(), b.graph.edges().collect::<Vec<_>>());
    }

    #[test]
    fn summary_display_is_readable() {
        let summary = IngestionSummary {
            files: 3,
            failed_files: 1,
            chunks: 10,
            relations: 20,
            bridges: 2,
            nodes: 10,
            edges: 15,
            dropped_relations: 7,
            duration_ms: 42,
        };
        assert_eq!(
            summary.to_string(),
            "Ingested 3 files (1 failed): 10 chunks, 20 relations, 2 bridges -> 10 nodes, 15 edges (7 dropped) in 42ms"
        );
    }
}
