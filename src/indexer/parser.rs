//! Native tree-sitter parser wrapper.
//!
//! Grammars are statically linked. `CodeParser` carries no state: a fresh
//! `tree_sitter::Parser` is created per call because the C object is
//! `!Send`, which keeps per-file extraction trivially parallel.

use crate::error::{RepoMindError, Result};
use crate::types::Language;

/// Thin wrapper around native tree-sitter parsing.
pub struct CodeParser;

impl CodeParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse `content` using the grammar for `language` and return the
    /// concrete syntax tree. Trees containing syntax errors are returned
    /// as-is; see [`CodeParser::parse_strict`].
    pub fn parse(&self, content: &str, language: Language) -> Result<tree_sitter::Tree> {
        let ts_lang = Self::get_ts_language(language);

        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&ts_lang)
            .map_err(|e| RepoMindError::Parse(format!("Language version mismatch: {e}")))?;

        parser.parse(content, None).ok_or_else(|| {
            RepoMindError::Parse("tree-sitter returned None (timeout or cancellation)".into())
        })
    }

    /// Parse and reject trees that contain `ERROR` or `MISSING` nodes.
    pub fn parse_strict(&self, content: &str, language: Language) -> Result<tree_sitter::Tree> {
        let tree = self.parse(content, language)?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(RepoMindError::Parse(format!(
                "{language} source has syntax errors near line {}",
                first_error_line(root)
            )));
        }
        Ok(tree)
    }

    /// Return the native `tree_sitter::Language` for a [`Language`] variant.
    #[must_use]
    pub fn get_ts_language(language: Language) -> tree_sitter::Language {
        match language {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::JavaScript | Language::Jsx => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

impl Default for CodeParser {
    fn default() -> Self {
        Self::new()
    }
}

/// 1-based line of the first error node, for diagnostics.
fn first_error_line(root: tree_sitter::Node) -> usize {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return node.start_position().row + 1;
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    root.start_position().row + 1
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
