use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use repomind::config::{load_config, CliOverrides, RepoMindConfig};
use repomind::context::{QueryEngine, QuerySettings, SemanticSearch, StaticCandidates};
use repomind::graph::{CodeGraph, KeywordSearch};
use repomind::indexer::IngestionPipeline;
use repomind::observability::{init_logging, init_verbose_logging};
use repomind::types::RelationKind;

const DEFAULT_GRAPH_PATH: &str = ".repomind/graph.json";

#[derive(Parser)]
#[command(name = "repomind")]
#[command(version, about = "Multi-language code knowledge graph with HTTP bridge inference")]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a source tree and save its graph
    Index {
        /// Directory to ingest (default: current dir)
        #[arg(default_value = ".")]
        directory: String,
        /// Graph output path (default: <directory>/.repomind/graph.json)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also write the index documents as JSON
        #[arg(long)]
        documents: Option<PathBuf>,
    },
    /// Walk the execution flow behind a question
    Explain {
        query: String,
        #[command(flatten)]
        opts: QueryArgs,
        /// Print a Mermaid diagram instead of JSON
        #[arg(long)]
        mermaid: bool,
    },
    /// Report what breaks if the best-matching code changes
    Impact {
        query: String,
        #[command(flatten)]
        opts: QueryArgs,
    },
    /// Show the entry nodes for a question and how they connect
    Structure {
        query: String,
        #[command(flatten)]
        opts: QueryArgs,
        /// Print a Mermaid diagram instead of JSON
        #[arg(long)]
        mermaid: bool,
    },
    /// List inferred frontend → backend HTTP bridges
    Bridges {
        /// Saved graph
        #[arg(default_value = DEFAULT_GRAPH_PATH)]
        graph: PathBuf,
    },
    /// Show graph statistics
    Stats {
        /// Saved graph
        #[arg(default_value = DEFAULT_GRAPH_PATH)]
        graph: PathBuf,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Saved graph
    #[arg(long, default_value = DEFAULT_GRAPH_PATH)]
    graph: PathBuf,
    /// Comma-separated candidate node ids (skips keyword search)
    #[arg(long, value_delimiter = ',')]
    candidates: Vec<String>,
    /// Semantic candidates considered for entry discovery
    #[arg(long)]
    candidate_pool: Option<usize>,
    /// Maximum depth of the flow walk
    #[arg(long)]
    flow_depth: Option<usize>,
    /// Maximum depth of the impact walk
    #[arg(long)]
    impact_depth: Option<usize>,
}

fn main() {
    let cli = Cli::parse();
    if cli.verbose {
        init_verbose_logging();
    } else {
        init_logging();
    }

    match cli.command {
        Commands::Index {
            directory,
            out,
            documents,
        } => cmd_index(&directory, out, documents),
        Commands::Explain {
            query,
            opts,
            mermaid,
        } => {
            let report = engine(&opts)
                .explain(&query)
                .unwrap_or_else(|e| fail("explain failed", e));
            if mermaid {
                print!("{}", report.payload.to_mermaid());
            } else {
                print_json(&report);
            }
        }
        Commands::Impact { query, opts } => {
            let analysis = engine(&opts)
                .impact(&query)
                .unwrap_or_else(|e| fail("impact analysis failed", e));
            print_json(&analysis);
        }
        Commands::Structure {
            query,
            opts,
            mermaid,
        } => {
            let report = engine(&opts)
                .structure(&query)
                .unwrap_or_else(|e| fail("structure query failed", e));
            if mermaid {
                print!("{}", report.payload.to_mermaid());
            } else {
                print_json(&report);
            }
        }
        Commands::Bridges { graph } => cmd_bridges(&graph),
        Commands::Stats { graph } => cmd_stats(&graph),
    }
}

// ---------------------------------------------------------------------------
// CLI command implementations
// ---------------------------------------------------------------------------

fn fail(what: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("Error: {what}: {err}");
    process::exit(1);
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => fail("cannot serialize output", e),
    }
}

fn config_for(dir: Option<&Path>, overrides: &CliOverrides) -> RepoMindConfig {
    load_config(overrides, dir).unwrap_or_else(|e| fail("cannot load configuration", e))
}

fn open_graph(path: &Path) -> CodeGraph {
    if !path.exists() {
        eprintln!("Error: graph not found at '{}'", path.display());
        eprintln!("Run `repomind index <dir>` first to build one.");
        process::exit(1);
    }
    CodeGraph::load(path).unwrap_or_else(|e| fail("cannot load graph", e))
}

fn engine(opts: &QueryArgs) -> QueryEngine {
    let overrides = CliOverrides {
        flow_max_depth: opts.flow_depth,
        impact_max_depth: opts.impact_depth,
        candidate_pool: opts.candidate_pool,
    };
    let config = config_for(Some(Path::new(".")), &overrides);
    let graph = Arc::new(open_graph(&opts.graph));

    let search: Arc<dyn SemanticSearch> = if opts.candidates.is_empty() {
        Arc::new(KeywordSearch::new(&graph))
    } else {
        Arc::new(StaticCandidates::new(opts.candidates.clone()))
    };
    QueryEngine::new(graph, search, QuerySettings::from(&config.retrieval))
}

fn cmd_index(directory: &str, out: Option<PathBuf>, documents: Option<PathBuf>) {
    let root = PathBuf::from(directory)
        .canonicalize()
        .unwrap_or_else(|e| fail(&format!("cannot resolve directory '{directory}'"), e));

    let config = config_for(Some(&root), &CliOverrides::default());
    let pipeline =
        IngestionPipeline::new(&config).unwrap_or_else(|e| fail("invalid bridge configuration", e));
    let ingestion = pipeline
        .ingest_dir(&root, &config.ingest)
        .unwrap_or_else(|e| fail("ingestion failed", e));

    let graph_path = out.unwrap_or_else(|| root.join(DEFAULT_GRAPH_PATH));
    ingestion
        .graph
        .save(&graph_path)
        .unwrap_or_else(|e| fail("cannot save graph", e));

    if let Some(path) = documents {
        let json = serde_json::to_string_pretty(&ingestion.documents)
            .unwrap_or_else(|e| fail("cannot serialize documents", e));
        std::fs::write(&path, json).unwrap_or_else(|e| fail("cannot write documents", e));
        println!("Documents: {} written to {}", ingestion.documents.len(), path.display());
    }

    println!("{}", ingestion.summary);
    println!("Graph saved to {}", graph_path.display());
}

fn cmd_bridges(path: &Path) {
    let graph = open_graph(path);
    let bridges: Vec<_> = graph.edges_of_kind(RelationKind::HttpCall).collect();
    if bridges.is_empty() {
        println!("No HTTP bridges found.");
        return;
    }

    println!("HTTP bridges ({} found):", bridges.len());
    for relation in bridges {
        match &relation.bridge {
            Some(b) => println!(
                "  {} -> {}  [{} {} via {}, score {:.2}]",
                relation.from, relation.to, b.http_method, b.route, b.api_type, b.score
            ),
            None => println!("  {} -> {}", relation.from, relation.to),
        }
    }
}

fn cmd_stats(path: &Path) {
    let graph = open_graph(path);
    println!("Graph: {}", path.display());
    println!("  Nodes:             {}", graph.node_count());
    println!("  Edges:             {}", graph.edge_count());
    println!("  Dropped relations: {}", graph.dropped_relations());

    for kind in [
        RelationKind::Import,
        RelationKind::Inherits,
        RelationKind::Call,
        RelationKind::Instantiates,
        RelationKind::Returns,
        RelationKind::DecoratedBy,
        RelationKind::Parameter,
        RelationKind::HttpCall,
    ] {
        let count = graph.edges_of_kind(kind).count();
        if count > 0 {
            println!("    {:14} {}", kind.as_str(), count);
        }
    }
}
