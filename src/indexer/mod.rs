//! Indexer: parse source files, extract chunks and relations, and run the
//! ingestion pipeline that produces the code graph.

pub mod extractor;
pub mod languages;
pub mod parser;
pub mod pipeline;

pub use extractor::{ExtractorRegistry, LanguageExtractor};
pub use parser::CodeParser;
pub use pipeline::{collect_sources, Ingestion, IngestionPipeline, IngestionSummary};
