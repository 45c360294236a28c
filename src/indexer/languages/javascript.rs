//! JavaScript / TypeScript extractor (including JSX and TSX).
//!
//! Arrow functions and function expressions only become chunks when bound
//! to a name (variable declarator or class field). Object-literal methods
//! are not chunks.

use tree_sitter::Node;

use crate::error::Result;
use crate::indexer::extractor::{
    children, field_text, has_child_kind, lookup_kind, named_children, node_text, preorder,
    strip_quotes, ExtractionBuilder, LanguageExtractor,
};
use crate::indexer::parser::CodeParser;
use crate::types::{ChunkKind, Confidence, FileExtraction, Language, RelationKind, SourceFile};

/// Parse-tree node kind → base chunk kind.
const NODE_KINDS: &[(&str, ChunkKind)] = &[
    ("function_declaration", ChunkKind::Function),
    ("generator_function_declaration", ChunkKind::Function),
    ("class_declaration", ChunkKind::Class),
    ("abstract_class_declaration", ChunkKind::Class),
    ("interface_declaration", ChunkKind::Interface),
    ("enum_declaration", ChunkKind::Enum),
    ("method_definition", ChunkKind::Method),
    ("arrow_function", ChunkKind::ArrowFunction),
    ("function_expression", ChunkKind::Function),
];

const SKIP_SUBTREES: &[&str] = &["decorator"];

pub struct JavaScriptExtractor;

impl LanguageExtractor for JavaScriptExtractor {
    fn languages(&self) -> &'static [Language] {
        &[
            Language::JavaScript,
            Language::Jsx,
            Language::TypeScript,
            Language::Tsx,
        ]
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
                "import_statement" => {
                    if let Some(source) = field_text(node, "source", src) {
                        out.relate_file(
                            strip_quotes(source),
                            RelationKind::Import,
                            Confidence::Explicit,
                            node,
                        );
                    }
                }
                "call_expression" => {
                    if let Some(callee) = node
                        .child_by_field_name("function")
                        .and_then(|f| callee_name(f, src))
                    {
                        out.relate_enclosing(callee, RelationKind::Call, Confidence::Syntactic, node);
                    }
                }
                "new_expression" => {
                    if let Some(class) = node
                        .child_by_field_name("constructor")
                        .and_then(|c| callee_name(c, src))
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

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

fn declare(out: &mut ExtractionBuilder, node: Node, base: ChunkKind, src: &str) {
    let Some((name, kind, owner)) = classify(node, base, src) else {
        return;
    };

    let decorator_nodes = decorators_of(owner);
    let decorators = decorator_nodes
        .iter()
        .map(|d| node_text(*d, src).trim().to_string())
        .collect();
    let parameters = parameter_list(node)
        .map(|p| parameter_names(p, src))
        .unwrap_or_default();

    out.push_chunk(node, name, kind, parameters, decorators);

    for decorator in &decorator_nodes {
        if let Some(target) = decorator.named_child(0).and_then(|e| callee_name(e, src)) {
            out.relate_named(name, target, RelationKind::DecoratedBy, Confidence::Explicit, *decorator);
        }
    }

    for clause in children(node)
        .into_iter()
        .filter(|c| matches!(c.kind(), "class_heritage" | "extends_type_clause"))
    {
        for parent in heritage_names(clause, src) {
            out.relate_named(name, parent, RelationKind::Inherits, Confidence::Explicit, clause);
        }
    }

    if let Some(ret) = node
        .child_by_field_name("return_type")
        .and_then(|r| first_type_identifier(r, src))
    {
        out.relate_named(name, ret, RelationKind::Returns, Confidence::Explicit, node);
    }

    if let Some(params) = parameter_list(node) {
        for param in named_children(params) {
            if let Some(ty) = param
                .child_by_field_name("type")
                .and_then(|t| first_type_identifier(t, src))
            {
                out.relate_enclosing(ty, RelationKind::Parameter, Confidence::Syntactic, param);
            }
        }
    }
}

/// Name, refined kind, and the node that carries the decorators.
fn classify<'t, 's>(
    node: Node<'t>,
    base: ChunkKind,
    src: &'s str,
) -> Option<(&'s str, ChunkKind, Node<'t>)> {
    match node.kind() {
        "method_definition" => {
            if node.parent()?.kind() != "class_body" {
                return None;
            }
            let name = field_text(node, "name", src)?;
            let kind = if name == "constructor" {
                ChunkKind::Constructor
            } else if has_child_kind(node, "static") {
                ChunkKind::StaticMethod
            } else {
                base
            };
            Some((name, kind, node))
        }
        "arrow_function" | "function_expression" => {
            let parent = node.parent()?;
            let binding = match parent.kind() {
                "variable_declarator" | "public_field_definition" => {
                    parent.child_by_field_name("name")
                }
                "field_definition" => parent.child_by_field_name("property"),
                _ => None,
            }?;
            if !matches!(
                binding.kind(),
                "identifier" | "property_identifier" | "private_property_identifier"
            ) {
                return None;
            }
            Some((node_text(binding, src), base, parent))
        }
        _ => Some((field_text(node, "name", src)?, base, node)),
    }
}

/// Decorators on `owner`, plus those on an enclosing `export` statement.
fn decorators_of(owner: Node) -> Vec<Node> {
    let mut found = Vec::new();
    if let Some(export) = owner.parent().filter(|p| p.kind() == "export_statement") {
        found.extend(children(export).into_iter().filter(|c| c.kind() == "decorator"));
    }
    found.extend(children(owner).into_iter().filter(|c| c.kind() == "decorator"));
    found
}

fn parameter_list(node: Node) -> Option<Node> {
    node.child_by_field_name("parameters")
        .or_else(|| node.child_by_field_name("parameter"))
}

fn parameter_names(params: Node, src: &str) -> Vec<String> {
    // `x => ...` has a bare identifier instead of a list.
    if params.kind() == "identifier" {
        return vec![node_text(params, src).to_string()];
    }
    named_children(params)
        .into_iter()
        .filter_map(|p| match p.kind() {
            "identifier" | "rest_pattern" | "object_pattern" | "array_pattern" => {
                Some(node_text(p, src))
            }
            "assignment_pattern" => field_text(p, "left", src),
            "required_parameter" | "optional_parameter" => field_text(p, "pattern", src),
            _ => None,
        })
        .map(str::to_string)
        .collect()
}

/// Names in an `extends`/`implements` clause, ignoring type arguments.
fn heritage_names<'s>(clause: Node, src: &'s str) -> Vec<&'s str> {
    let mut names = Vec::new();
    let mut stack = vec![clause];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "identifier" | "type_identifier" => names.push(node_text(node, src)),
            "member_expression" => {
                if let Some(property) = field_text(node, "property", src) {
                    names.push(property);
                }
            }
            "nested_type_identifier" => {
                if let Some(name) = field_text(node, "name", src) {
                    names.push(name);
                }
            }
            "type_arguments" | "arguments" => {}
            _ => {
                let mut kids = named_children(node);
                kids.reverse();
                stack.extend(kids);
            }
        }
    }
    names
}

fn first_type_identifier<'s>(annotation: Node, src: &'s str) -> Option<&'s str> {
    preorder(annotation, &[])
        .into_iter()
        .find(|n| n.kind() == "type_identifier")
        .map(|n| node_text(n, src))
}

/// Callee of a call/new/decorator: `f`, `obj.method` → `method`, `f(...)` → `f`.
fn callee_name<'s>(expr: Node, src: &'s str) -> Option<&'s str> {
    match expr.kind() {
        "identifier" => Some(node_text(expr, src)),
        "member_expression" => field_text(expr, "property", src),
        "call_expression" => callee_name(expr.child_by_field_name("function")?, src),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
