//! Per-language extraction interface and the shared walking machinery.
//!
//! Every supported language implements [`LanguageExtractor`]. The
//! [`ExtractorRegistry`] is the dispatch table from file extension (via
//! [`Language`]) to implementation, and the boundary where a parse
//! failure is turned into an empty result instead of aborting the batch.
//!
//! Implementations walk the tree once in document order and feed an
//! [`ExtractionBuilder`]. Relations whose caller is "whatever chunk
//! encloses this line" are resolved only after the walk, once every chunk
//! of the file is known.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;
use tree_sitter::Node;

use crate::error::Result;
use crate::indexer::languages::{JavaExtractor, JavaScriptExtractor, PythonExtractor};
use crate::types::{
    chunk_id, Chunk, ChunkKind, Confidence, FileExtraction, Language, Relation, RelationKind,
    SourceFile,
};

// ---------------------------------------------------------------------------
// LanguageExtractor
// ---------------------------------------------------------------------------

/// One implementation per language family.
pub trait LanguageExtractor: Send + Sync {
    /// Languages this extractor accepts.
    fn languages(&self) -> &'static [Language];

    /// Turn one file into ordered chunks and raw relations.
    ///
    /// Returns `Err(RepoMindError::Parse)` when the file cannot be parsed.
    fn extract(&self, file: &SourceFile) -> Result<FileExtraction>;
}

// ---------------------------------------------------------------------------
// ExtractorRegistry
// ---------------------------------------------------------------------------

/// Dispatch table from language to extractor.
#[derive(Clone)]
pub struct ExtractorRegistry {
    by_language: HashMap<Language, Arc<dyn LanguageExtractor>>,
}

impl ExtractorRegistry {
    /// A registry with no extractors.
    pub fn empty() -> Self {
        Self {
            by_language: HashMap::new(),
        }
    }

    /// Register `extractor` for every language it declares, replacing any
    /// previous registration.
    pub fn register(&mut self, extractor: Arc<dyn LanguageExtractor>) {
        for language in extractor.languages() {
            self.by_language.insert(*language, Arc::clone(&extractor));
        }
    }

    pub fn for_language(&self, language: Language) -> Option<&dyn LanguageExtractor> {
        self.by_language.get(&language).map(|e| e.as_ref())
    }

    /// Look up the extractor for a path by its extension.
    pub fn for_path(&self, path: &str) -> Option<&dyn LanguageExtractor> {
        let language = Language::from_path(std::path::Path::new(path))?;
        self.for_language(language)
    }

    pub fn supports(&self, language: Language) -> bool {
        self.by_language.contains_key(&language)
    }

    /// Extract one file, propagating parse failures.
    pub fn try_extract(&self, file: &SourceFile) -> Result<FileExtraction> {
        match self.for_language(file.language) {
            Some(extractor) => extractor.extract(file),
            None => Ok(FileExtraction::default()),
        }
    }

    /// Extract one file; a parse failure yields an empty result.
    pub fn extract(&self, file: &SourceFile) -> FileExtraction {
        match self.try_extract(file) {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!(path = %file.path, error = %e, "skipping unparseable file");
                FileExtraction::default()
            }
        }
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(PythonExtractor));
        registry.register(Arc::new(JavaExtractor));
        registry.register(Arc::new(JavaScriptExtractor));
        registry
    }
}

// ---------------------------------------------------------------------------
// ExtractionBuilder
// ---------------------------------------------------------------------------

/// Who a pending relation is attributed to.
enum Origin {
    /// The file itself (imports).
    File,
    /// A known declaration name.
    Named(String),
    /// The smallest chunk enclosing the relation's line.
    Enclosing,
}

struct PendingRelation {
    origin: Origin,
    to: String,
    kind: RelationKind,
    confidence: Confidence,
    line: u32,
}

/// Collects chunks and relations for one file during a tree walk.
pub struct ExtractionBuilder<'a> {
    file: &'a SourceFile,
    chunks: Vec<Chunk>,
    pending: Vec<PendingRelation>,
}

impl<'a> ExtractionBuilder<'a> {
    pub fn new(file: &'a SourceFile) -> Self {
        Self {
            file,
            chunks: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Emit a chunk spanning `span`.
    pub fn push_chunk(
        &mut self,
        span: Node,
        name: &str,
        kind: ChunkKind,
        parameters: Vec<String>,
        decorators: Vec<String>,
    ) {
        let (start_line, end_line) = line_span(span);
        self.chunks.push(Chunk {
            id: chunk_id(&self.file.path, name),
            name: name.to_string(),
            kind,
            language: self.file.language,
            file_path: self.file.path.clone(),
            start_line,
            end_line,
            code_text: node_text(span, &self.file.content).to_string(),
            parameters,
            decorators,
        });
    }

    /// A relation attributed to the file itself.
    pub fn relate_file(&mut self, to: &str, kind: RelationKind, confidence: Confidence, at: Node) {
        self.pend(Origin::File, to, kind, confidence, at);
    }

    /// A relation attributed to a named declaration.
    pub fn relate_named(
        &mut self,
        from: &str,
        to: &str,
        kind: RelationKind,
        confidence: Confidence,
        at: Node,
    ) {
        self.pend(Origin::Named(from.to_string()), to, kind, confidence, at);
    }

    /// A relation attributed to the smallest chunk enclosing `at`.
    pub fn relate_enclosing(
        &mut self,
        to: &str,
        kind: RelationKind,
        confidence: Confidence,
        at: Node,
    ) {
        self.pend(Origin::Enclosing, to, kind, confidence, at);
    }

    fn pend(&mut self, origin: Origin, to: &str, kind: RelationKind, confidence: Confidence, at: Node) {
        let to = to.trim();
        if to.is_empty() {
            return;
        }
        self.pending.push(PendingRelation {
            origin,
            to: to.to_string(),
            kind,
            confidence,
            line: line_of(at),
        });
    }

    /// Add the fallback module chunk if needed and resolve callers.
    pub fn finish(self) -> FileExtraction {
        let Self {
            file,
            mut chunks,
            pending,
        } = self;

        if chunks.is_empty() {
            chunks.push(fallback_module_chunk(file));
        }

        let relations = pending
            .into_iter()
            .filter_map(|p| {
                let from = match p.origin {
                    Origin::File => file.file_name().to_string(),
                    Origin::Named(name) => name,
                    Origin::Enclosing => smallest_enclosing(&chunks, p.line)?.name.clone(),
                };
                Some(
                    Relation::new(from, p.to, p.kind, file.language, p.confidence).at_line(p.line),
                )
            })
            .collect();

        FileExtraction { chunks, relations }
    }
}

// ---------------------------------------------------------------------------
// Attribution helpers
// ---------------------------------------------------------------------------

/// The chunk with the latest start and earliest end that contains `line`.
///
/// Ties keep the chunk that was emitted first.
pub fn smallest_enclosing<'c, I>(chunks: I, line: u32) -> Option<&'c Chunk>
where
    I: IntoIterator<Item = &'c Chunk>,
{
    let mut best: Option<&'c Chunk> = None;
    for chunk in chunks.into_iter().filter(|c| c.contains_line(line)) {
        let tighter = match best {
            None => true,
            Some(b) => {
                chunk.start_line > b.start_line
                    || (chunk.start_line == b.start_line && chunk.end_line < b.end_line)
            }
        };
        if tighter {
            best = Some(chunk);
        }
    }
    best
}

/// One `module` chunk covering a file that declared nothing.
pub fn fallback_module_chunk(file: &SourceFile) -> Chunk {
    let line_count = file.content.lines().count().max(1) as u32;
    let name = file.stem();
    Chunk {
        id: chunk_id(&file.path, name),
        name: name.to_string(),
        kind: ChunkKind::Module,
        language: file.language,
        file_path: file.path.clone(),
        start_line: 1,
        end_line: line_count,
        code_text: file.content.clone(),
        parameters: Vec::new(),
        decorators: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tree helpers
// ---------------------------------------------------------------------------

/// Look up a node kind in a per-language chunk table.
pub fn lookup_kind(table: &[(&str, ChunkKind)], node_kind: &str) -> Option<ChunkKind> {
    table
        .iter()
        .find(|(kind, _)| *kind == node_kind)
        .map(|(_, chunk_kind)| *chunk_kind)
}

/// All nodes in document (pre-)order, without descending into `skip` kinds.
pub fn preorder<'t>(root: Node<'t>, skip: &[&str]) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        if skip.contains(&node.kind()) {
            continue;
        }
        let mut children = named_children(node);
        children.reverse();
        stack.extend(children);
    }
    out
}

pub fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub fn children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Whether `node` has an anonymous or named child of the given kind.
pub fn has_child_kind(node: Node, kind: &str) -> bool {
    children(node).iter().any(|c| c.kind() == kind)
}

/// Extract the text of a node from the source.
pub fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Text of a named field, if present.
pub fn field_text<'s>(node: Node, field: &str, source: &'s str) -> Option<&'s str> {
    node.child_by_field_name(field).map(|n| node_text(n, source))
}

/// 1-based start line.
pub fn line_of(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// 1-based inclusive line range of a node.
fn line_span(node: Node) -> (u32, u32) {
    let start = node.start_position();
    let end = node.end_position();
    let mut end_row = end.row;
    // A node ending right after a newline does not occupy the next line.
    if end.column == 0 && end_row > start.row {
        end_row -= 1;
    }
    (start.row as u32 + 1, end_row as u32 + 1)
}

/// Strip surrounding quotes (including template backticks) from a literal.
pub fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    for quote in ['"', '\'', '`'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Last `.`-separated segment of a dotted name.
pub fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name).trim()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(name: &str, start: u32, end: u32) -> Chunk {
        Chunk {
            id: chunk_id("a.py", name),
            name: name.into(),
            kind: ChunkKind::Function,
            language: Language::Python,
            file_path: "a.py".into(),
            start_line: start,
            end_line: end,
            code_text: String::new(),
            parameters: vec![],
            decorators: vec![],
        }
    }

    #[test]
    fn smallest_enclosing_prefers_innermost() {
        let chunks = vec![chunk("Outer", 1, 20), chunk("inner", 5, 10), chunk("later", 12, 18)];
        assert_eq!(smallest_enclosing(&chunks, 7).map(|c| c.name.as_str()), Some("inner"));
        assert_eq!(smallest_enclosing(&chunks, 11).map(|c| c.name.as_str()), Some("Outer"));
        assert_eq!(smallest_enclosing(&chunks, 15).map(|c| c.name.as_str()), Some("later"));
        assert!(smallest_enclosing(&chunks, 25).is_none());
    }

    #[test]
    fn smallest_enclosing_same_start_picks_earliest_end() {
        let chunks = vec![chunk("wide", 3, 9), chunk("narrow", 3, 4)];
        assert_eq!(smallest_enclosing(&chunks, 3).map(|c| c.name.as_str()), Some("narrow"));
    }

    #[test]
    fn fallback_module_spans_whole_file() {
        let file = SourceFile::new("cfg/settings.py", "A = 1\nB = 2\nC = 3\n", Language::Python);
        let module = fallback_module_chunk(&file);
        assert_eq!(module.kind, ChunkKind::Module);
        assert_eq!(module.name, "settings");
        assert_eq!(module.id, "cfg/settings.py::settings");
        assert_eq!((module.start_line, module.end_line), (1, 3));

        let empty = SourceFile::new("empty.py", "", Language::Python);
        assert_eq!(fallback_module_chunk(&empty).end_line, 1);
    }

    #[test]
    fn registry_dispatches_by_extension() {
        let registry = ExtractorRegistry::default();
        assert!(registry.for_path("src/app.py").is_some());
        assert!(registry.for_path("src/Main.java").is_some());
        assert!(registry.for_path("src/App.tsx").is_some());
        assert!(registry.for_path("src/main.go").is_none());
        assert!(registry.supports(Language::Jsx));
    }

    #[test]
    fn registry_isolates_parse_failures() {
        let registry = ExtractorRegistry::default();
        let broken = SourceFile::new("bad.py", "def oops(:\n  return\n", Language::Python);
        assert!(registry.try_extract(&broken).is_err());
        assert!(registry.extract(&broken).is_empty());
    }

    #[test]
    fn empty_registry_yields_nothing() {
        let registry = ExtractorRegistry::empty();
        let file = SourceFile::new("a.py", "def f():\n    pass\n", Language::Python);
        assert!(registry.extract(&file).is_empty());
    }

    #[test]
    fn strip_quotes_handles_all_literal_styles() {
        assert_eq!(strip_quotes("'/api/users'"), "/api/users");
        assert_eq!(strip_quotes("\"react\""), "react");
        assert_eq!(strip_quotes("`/x/${id}`"), "/x/${id}");
        assert_eq!(strip_quotes("bare"), "bare");
        assert_eq!(last_segment("java.util.List"), "List");
    }
}
