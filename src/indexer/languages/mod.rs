//! Language-specific extractors.
//!
//! Each module declares its node-kind → chunk-kind table as data and
//! walks the tree once, feeding an
//! [`ExtractionBuilder`](crate::indexer::extractor::ExtractionBuilder).

pub mod java;
pub mod javascript;
pub mod python;

pub use java::JavaExtractor;
pub use javascript::JavaScriptExtractor;
pub use python::PythonExtractor;
