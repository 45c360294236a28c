//! Java extractor.
//!
//! Annotation usages (`@GetMapping(...)`) are read from a declaration's
//! `modifiers` into its `decorators`; the walk never descends into them, so
//! they cannot surface as chunks or calls.

use tree_sitter::Node;

use crate::error::Result;
use crate::indexer::extractor::{
    children, field_text, has_child_kind, last_segment, lookup_kind, named_children, node_text,
    preorder, ExtractionBuilder, LanguageExtractor,
};
use crate::indexer::parser::CodeParser;
use crate::types::{ChunkKind, Confidence, FileExtraction, Language, RelationKind, SourceFile};

/// Parse-tree node kind → base chunk kind.
const NODE_KINDS: &[(&str, ChunkKind)] = &[
    ("class_declaration", ChunkKind::Class),
    ("record_declaration", ChunkKind::Class),
    ("interface_declaration", ChunkKind::Interface),
    ("enum_declaration", ChunkKind::Enum),
    ("annotation_type_declaration", ChunkKind::Annotation),
    ("constructor_declaration", ChunkKind::Constructor),
    ("method_declaration", ChunkKind::Method),
];

const SKIP_SUBTREES: &[&str] = &["annotation", "marker_annotation"];

/// Bodies whose methods are members rather than free functions.
const TYPE_BODIES: &[&str] = &[
    "class_body",
    "interface_body",
    "enum_body_declarations",
    "annotation_type_body",
];

pub struct JavaExtractor;

impl LanguageExtractor for JavaExtractor {
    fn languages(&self) -> &'static [Language] {
        &[Language::Java]
    }

    fn extract(&self, file: &SourceFile) -> Result<FileExtraction> {
        let tree = CodeParser::new().parse_strict(&file.content, file.language)?;
        let src = file.content.as_str();
        let mut out = ExtractionBuilder::new(file);

        for node in preorder(tree.root_node(), SKIP_SUBTREES) {
            if let Some(base) = lookup_kind(NODE_KINDS, node.kind()) {
                declare(&mut out, node, base, src);
            }
            match node.kind() {
                "import_declaration" => {
                    let target = import_target(node_text(node, src));
                    out.relate_file(target, RelationKind::Import, Confidence::Explicit, node);
                }
                "method_invocation" => {
                    if let Some(method) = field_text(node, "name", src) {
                        out.relate_enclosing(method, RelationKind::Call, Confidence::Syntactic, node);
                    }
                }
                "object_creation_expression" => {
                    if let Some(class) = node
                        .child_by_field_name("type")
                        .and_then(|t| type_name(t, src))
                    {
                        out.relate_enclosing(
                            class,
                            RelationKind::Instantiates,
                            Confidence::Explicit,
                            node,
                        );
                    }
                }
                _ => {}
            }
        }

        Ok(out.finish())
    }
}

fn declare(out: &mut ExtractionBuilder, node: Node, base: ChunkKind, src: &str) {
    let Some(name) = field_text(node, "name", src) else {
        return;
    };

    let modifiers = children(node)
        .into_iter()
        .find(|c| c.kind() == "modifiers");
    let annotations: Vec<Node> = modifiers
        .map(|m| {
            named_children(m)
                .into_iter()
                .filter(|c| matches!(c.kind(), "annotation" | "marker_annotation"))
                .collect()
        })
        .unwrap_or_default();
    let is_static = modifiers.is_some_and(|m| has_child_kind(m, "static"));

    let kind = match base {
        ChunkKind::Method => {
            let in_type = node.parent().is_some_and(|p| TYPE_BODIES.contains(&p.kind()));
            match (in_type, is_static) {
                (false, _) => ChunkKind::Function,
                (true, true) => ChunkKind::StaticMethod,
                (true, false) => ChunkKind::Method,
            }
        }
        other => other,
    };

    let params = node.child_by_field_name("parameters");
    let parameters = params.map(|p| parameter_names(p, src)).unwrap_or_default();
    let decorators = annotations
        .iter()
        .map(|a| node_text(*a, src).trim().to_string())
        .collect();

    out.push_chunk(node, name, kind, parameters, decorators);

    for annotation in &annotations {
        if let Some(target) = field_text(*annotation, "name", src) {
            out.relate_named(
                name,
                last_segment(target),
                RelationKind::DecoratedBy,
                Confidence::Explicit,
                *annotation,
            );
        }
    }

    // extends / implements
    for clause in heritage_clauses(node) {
        for ty in named_children(clause) {
            let types = if ty.kind() == "type_list" {
                named_children(ty)
            } else {
                vec![ty]
            };
            for ty in types {
                if let Some(parent) = type_name(ty, src) {
                    out.relate_named(name, parent, RelationKind::Inherits, Confidence::Explicit, ty);
                }
            }
        }
    }

    if base == ChunkKind::Method {
        if let Some(ret) = node
            .child_by_field_name("type")
            .and_then(|t| type_name(t, src))
        {
            out.relate_named(name, ret, RelationKind::Returns, Confidence::Explicit, node);
        }
    }

    if let Some(params) = params {
        for param in named_children(params) {
            if let Some(ty) = param
                .child_by_field_name("type")
                .and_then(|t| type_name(t, src))
            {
                out.relate_enclosing(ty, RelationKind::Parameter, Confidence::Syntactic, param);
            }
        }
    }
}

fn heritage_clauses(node: Node) -> Vec<Node> {
    let mut clauses: Vec<Node> = ["superclass", "interfaces"]
        .iter()
        .filter_map(|field| node.child_by_field_name(field))
        .collect();
    clauses.extend(
        children(node)
            .into_iter()
            .filter(|c| c.kind() == "extends_interfaces"),
    );
    clauses
}

fn parameter_names(params: Node, src: &str) -> Vec<String> {
    named_children(params)
        .into_iter()
        .filter_map(|p| match p.kind() {
            "formal_parameter" => field_text(p, "name", src),
            "spread_parameter" => named_children(p)
                .into_iter()
                .find(|c| c.kind() == "variable_declarator")
                .and_then(|d| field_text(d, "name", src)),
            _ => None,
        })
        .map(str::to_string)
        .collect()
}

/// Simple name of a reference type; primitives and `void` yield `None`.
fn type_name<'s>(node: Node, src: &'s str) -> Option<&'s str> {
    match node.kind() {
        "type_identifier" => Some(node_text(node, src)),
        "scoped_type_identifier" => named_children(node)
            .into_iter()
            .rev()
            .find(|c| c.kind() == "type_identifier")
            .map(|c| node_text(c, src)),
        "generic_type" => named_children(node)
            .into_iter()
            .find(|c| matches!(c.kind(), "type_identifier" | "scoped_type_identifier"))
            .and_then(|c| type_name(c, src)),
        "array_type" => node
            .child_by_field_name("element")
            .and_then(|e| type_name(e, src)),
        _ => None,
    }
}

/// `import static a.b.C;` → `a.b.C`.
fn import_target(statement: &str) -> &str {
    let body = statement.trim().trim_end_matches(';').trim();
    let body = body.strip_prefix("import").unwrap_or(body).trim_start();
    body.strip_prefix("static ").unwrap_or(body).trim()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
