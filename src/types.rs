//! Core domain types for RepoMind.
//!
//! Chunks and relations are the currency between the extractors, the
//! bridge inferencer and the graph builder. Relations carry raw names;
//! they only become edges once both endpoints resolve to a chunk.

use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Supported source languages (JSX/TSX counted as their own variants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    JavaScript,
    Jsx,
    TypeScript,
    Tsx,
}

impl Language {
    /// Map a file extension (including the dot) to a language.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            ".py" => Some(Self::Python),
            ".java" => Some(Self::Java),
            ".js" | ".mjs" | ".cjs" => Some(Self::JavaScript),
            ".jsx" => Some(Self::Jsx),
            ".ts" | ".mts" | ".cts" => Some(Self::TypeScript),
            ".tsx" => Some(Self::Tsx),
            _ => None,
        }
    }

    /// Detect the language of a path from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_extension(&format!(".{ext}"))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Java => "java",
            Self::JavaScript => "javascript",
            Self::Jsx => "jsx",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
        }
    }

    /// Parse from a string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Some(Self::Python),
            "java" => Some(Self::Java),
            "javascript" | "js" => Some(Self::JavaScript),
            "jsx" => Some(Self::Jsx),
            "typescript" | "ts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            _ => None,
        }
    }

    /// Languages whose code issues HTTP requests in the bridge model.
    pub fn is_frontend(&self) -> bool {
        matches!(
            self,
            Self::JavaScript | Self::Jsx | Self::TypeScript | Self::Tsx
        )
    }

    /// Languages whose code declares HTTP handlers in the bridge model.
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Python | Self::Java)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ChunkKind
// ---------------------------------------------------------------------------

/// Kinds of structural units emitted by the extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Module,
    Class,
    Interface,
    Enum,
    Annotation,
    Function,
    AsyncFunction,
    Method,
    AsyncMethod,
    StaticMethod,
    ClassMethod,
    Constructor,
    ArrowFunction,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Annotation => "annotation",
            Self::Function => "function",
            Self::AsyncFunction => "async_function",
            Self::Method => "method",
            Self::AsyncMethod => "async_method",
            Self::StaticMethod => "static_method",
            Self::ClassMethod => "class_method",
            Self::Constructor => "constructor",
            Self::ArrowFunction => "arrow_function",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "module" => Some(Self::Module),
            "class" => Some(Self::Class),
            "interface" => Some(Self::Interface),
            "enum" => Some(Self::Enum),
            "annotation" => Some(Self::Annotation),
            "function" => Some(Self::Function),
            "async_function" => Some(Self::AsyncFunction),
            "method" => Some(Self::Method),
            "async_method" => Some(Self::AsyncMethod),
            "static_method" => Some(Self::StaticMethod),
            "class_method" => Some(Self::ClassMethod),
            "constructor" => Some(Self::Constructor),
            "arrow_function" | "arrow" => Some(Self::ArrowFunction),
            _ => None,
        }
    }

    /// Type-like kinds whose source text also holds their members.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Class | Self::Interface | Self::Enum | Self::Annotation
        )
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RelationKind
// ---------------------------------------------------------------------------

/// Kinds of directed facts between two named entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Import,
    Inherits,
    Call,
    Instantiates,
    Returns,
    DecoratedBy,
    Parameter,
    HttpCall,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Inherits => "inherits",
            Self::Call => "call",
            Self::Instantiates => "instantiates",
            Self::Returns => "returns",
            Self::DecoratedBy => "decorated_by",
            Self::Parameter => "parameter",
            Self::HttpCall => "http_call",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// How much a relation can be trusted.
///
/// The first three describe syntactic extraction; `High`/`Medium`/`Low`
/// are bridge confidence tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Explicit,
    Syntactic,
    Heuristic,
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Label a bridge score: high at 0.9 and above, medium at 0.7 and above.
    pub fn from_bridge_score(score: f64) -> Self {
        if score >= 0.9 {
            Self::High
        } else if score >= 0.7 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Syntactic => "syntactic",
            Self::Heuristic => "heuristic",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HttpMethod
// ---------------------------------------------------------------------------

/// HTTP verb seen at a call site or on a handler declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    #[serde(rename = "unknown")]
    Unknown,
}

impl HttpMethod {
    /// Parse a verb case-insensitively; anything unrecognised is `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "PATCH" => Self::Patch,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            _ => Self::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Self::Unknown
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// A named structural unit of code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub name: String,
    pub kind: ChunkKind,
    pub language: Language,
    pub file_path: String,
    /// 1-based, inclusive.
    pub start_line: u32,
    /// 1-based, inclusive.
    pub end_line: u32,
    pub code_text: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Raw decorator/annotation source, in declaration order.
    #[serde(default)]
    pub decorators: Vec<String>,
}

impl Chunk {
    /// Whether `line` falls within this chunk's inclusive range.
    pub fn contains_line(&self, line: u32) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

// ---------------------------------------------------------------------------
// Relation
// ---------------------------------------------------------------------------

/// Bridge-only attributes of an `http_call` relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpBridge {
    /// Route literal as written at the call site.
    pub route: String,
    /// Route declared by the handler.
    pub handler_route: String,
    pub http_method: HttpMethod,
    pub backend_method: HttpMethod,
    /// Call style: `fetch` or the client identifier (`axios`, ...).
    pub api_type: String,
    pub score: f64,
}

/// A directed fact between two raw names, resolved at graph build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub from: String,
    pub to: String,
    pub kind: RelationKind,
    /// `None` for cross-language relations; serialized as `"cross"`.
    #[serde(with = "language_label")]
    pub source_language: Option<Language>,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<HttpBridge>,
}

impl Relation {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        kind: RelationKind,
        language: Language,
        confidence: Confidence,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
            source_language: Some(language),
            confidence,
            line: None,
            bridge: None,
        }
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// Source language label; bridges report `"cross"`.
    pub fn language_label(&self) -> &'static str {
        self.source_language.map(|l| l.as_str()).unwrap_or("cross")
    }
}

// ---------------------------------------------------------------------------
// SourceFile / FileExtraction
// ---------------------------------------------------------------------------

/// One file handed to the extractors.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the ingestion root, `/`-separated.
    pub path: String,
    pub content: String,
    pub language: Language,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>, language: Language) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            language,
        }
    }

    /// Final path component, e.g. `views.py`.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }
}

/// Ordered chunks and raw relations for one file.
#[derive(Debug, Clone, Default)]
pub struct FileExtraction {
    pub chunks: Vec<Chunk>,
    pub relations: Vec<Relation>,
}

impl FileExtraction {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty() && self.relations.is_empty()
    }
}

/// Serde form of `Relation::source_language`: the language name, or
/// `"cross"` for bridges.
mod language_label {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Language;

    const CROSS: &str = "cross";

    pub fn serialize<S: Serializer>(language: &Option<Language>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(language.map(|l| l.as_str()).unwrap_or(CROSS))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Language>, D::Error> {
        let label = String::deserialize(d)?;
        if label == CROSS {
            return Ok(None);
        }
        Language::from_str_loose(&label)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("unknown source language `{label}`")))
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Build a deterministic chunk ID: `{filePath}::{name}`.
pub fn chunk_id(file_path: &str, name: &str) -> String {
    format!("{file_path}::{name}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
