//! Python extractor.
//!
//! Functions directly inside a class body become methods, refined by their
//! own decorators (`@staticmethod`, `@classmethod`) and `async`. Decorated
//! definitions span from their first decorator so the decorator source is
//! part of the chunk text.

use tree_sitter::Node;

use crate::error::Result;
use crate::indexer::extractor::{
    field_text, has_child_kind, last_segment, lookup_kind, named_children, node_text, preorder,
    strip_quotes, ExtractionBuilder, LanguageExtractor,
};
use crate::indexer::parser::CodeParser;
use crate::types::{ChunkKind, Confidence, FileExtraction, Language, RelationKind, SourceFile};

/// Parse-tree node kind → base chunk kind.
const NODE_KINDS: &[(&str, ChunkKind)] = &[
    ("class_definition", ChunkKind::Class),
    ("function_definition", ChunkKind::Function),
];

/// Calls inside decorators are not call relations.
const SKIP_SUBTREES: &[&str] = &["decorator"];

pub struct PythonExtractor;

impl LanguageExtractor for PythonExtractor {
    fn languages(&self) -> &'static [Language] {
        &[Language::Python]
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
                "import_statement" => import(&mut out, node, src),
                "import_from_statement" => import_from(&mut out, node, src),
                "call" => call(&mut out, node, src),
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
    let Some(name) = field_text(node, "name", src) else {
        return;
    };

    let wrapper = node
        .parent()
        .filter(|p| p.kind() == "decorated_definition");
    let span = wrapper.unwrap_or(node);
    let decorator_nodes: Vec<Node> = wrapper
        .map(|w| {
            named_children(w)
                .into_iter()
                .filter(|c| c.kind() == "decorator")
                .collect()
        })
        .unwrap_or_default();

    let decorators: Vec<String> = decorator_nodes
        .iter()
        .map(|d| node_text(*d, src).trim().to_string())
        .collect();
    let decorator_names: Vec<&str> = decorator_nodes
        .iter()
        .filter_map(|d| decorator_name(*d, src))
        .collect();

    let kind = match base {
        ChunkKind::Function => function_kind(node, &decorator_names),
        other => other,
    };
    let parameters = node
        .child_by_field_name("parameters")
        .map(|p| parameter_names(p, src))
        .unwrap_or_default();

    out.push_chunk(span, name, kind, parameters, decorators);

    for decorator in &decorator_nodes {
        if let Some(target) = decorator_name(*decorator, src) {
            out.relate_named(name, target, RelationKind::DecoratedBy, Confidence::Explicit, *decorator);
        }
    }

    match base {
        ChunkKind::Class => {
            if let Some(bases) = node.child_by_field_name("superclasses") {
                for base in named_children(bases) {
                    let target = match base.kind() {
                        "identifier" => Some(node_text(base, src)),
                        "attribute" => field_text(base, "attribute", src),
                        // metaclass=..., **kwargs
                        "keyword_argument" | "dictionary_splat" | "list_splat" => None,
                        _ => Some(node_text(base, src)),
                    };
                    if let Some(target) = target {
                        out.relate_named(name, target, RelationKind::Inherits, Confidence::Syntactic, base);
                    }
                }
            }
        }
        _ => {
            if let Some(ret) = node.child_by_field_name("return_type") {
                if let Some(target) = annotation_name(node_text(ret, src)) {
                    out.relate_named(name, target, RelationKind::Returns, Confidence::Explicit, ret);
                }
            }
            if let Some(params) = node.child_by_field_name("parameters") {
                for param in named_children(params) {
                    let Some(annotation) = param.child_by_field_name("type") else {
                        continue;
                    };
                    if let Some(target) = annotation_name(node_text(annotation, src)) {
                        out.relate_enclosing(target, RelationKind::Parameter, Confidence::Syntactic, param);
                    }
                }
            }
        }
    }
}

fn function_kind(node: Node, decorator_names: &[&str]) -> ChunkKind {
    let is_async = has_child_kind(node, "async");
    if is_class_member(node) {
        if decorator_names.contains(&"staticmethod") {
            ChunkKind::StaticMethod
        } else if decorator_names.contains(&"classmethod") {
            ChunkKind::ClassMethod
        } else if is_async {
            ChunkKind::AsyncMethod
        } else {
            ChunkKind::Method
        }
    } else if is_async {
        ChunkKind::AsyncFunction
    } else {
        ChunkKind::Function
    }
}

/// `def` directly in a class body, decorated or not.
fn is_class_member(node: Node) -> bool {
    let mut parent = node.parent();
    if parent.is_some_and(|p| p.kind() == "decorated_definition") {
        parent = parent.and_then(|p| p.parent());
    }
    parent
        .filter(|p| p.kind() == "block")
        .and_then(|block| block.parent())
        .is_some_and(|owner| owner.kind() == "class_definition")
}

fn parameter_names(params: Node, src: &str) -> Vec<String> {
    named_children(params)
        .into_iter()
        .filter_map(|p| match p.kind() {
            "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" => {
                Some(node_text(p, src))
            }
            "typed_parameter" => p.named_child(0).map(|n| node_text(n, src)),
            "default_parameter" | "typed_default_parameter" => field_text(p, "name", src),
            _ => None,
        })
        .map(str::to_string)
        .collect()
}

/// Core name of a decorator: `@app.get("/x")` → `get`.
fn decorator_name<'s>(decorator: Node, src: &'s str) -> Option<&'s str> {
    let mut expr = decorator.named_child(0)?;
    while expr.kind() == "call" {
        expr = expr.child_by_field_name("function")?;
    }
    match expr.kind() {
        "identifier" => Some(node_text(expr, src)),
        "attribute" => field_text(expr, "attribute", src),
        _ => None,
    }
}

/// Outer type name of an annotation: `Optional[User]` → `Optional`.
fn annotation_name(text: &str) -> Option<&str> {
    let text = strip_quotes(text);
    let head = text
        .split(|c: char| matches!(c, '[' | '|' | ',' | ' '))
        .next()?
        .trim();
    let name = last_segment(head);
    (!name.is_empty() && name != "None").then_some(name)
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

fn import(out: &mut ExtractionBuilder, node: Node, src: &str) {
    let mut cursor = node.walk();
    let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
    for name in names {
        let module = match name.kind() {
            "aliased_import" => field_text(name, "name", src),
            _ => Some(node_text(name, src)),
        };
        if let Some(module) = module {
            out.relate_file(module, RelationKind::Import, Confidence::Explicit, node);
        }
    }
}

fn import_from(out: &mut ExtractionBuilder, node: Node, src: &str) {
    let Some(module) = field_text(node, "module_name", src) else {
        return;
    };
    let mut cursor = node.walk();
    let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();

    if names.is_empty() {
        if has_child_kind(node, "wildcard_import") {
            let target = format!("{module}.*");
            out.relate_file(&target, RelationKind::Import, Confidence::Explicit, node);
        }
        return;
    }

    for name in names {
        let imported = match name.kind() {
            "aliased_import" => field_text(name, "name", src),
            _ => Some(node_text(name, src)),
        };
        if let Some(imported) = imported {
            let target = format!("{module}.{imported}");
            out.relate_file(&target, RelationKind::Import, Confidence::Explicit, node);
        }
    }
}

fn call(out: &mut ExtractionBuilder, node: Node, src: &str) {
    let Some(function) = node.child_by_field_name("function") else {
        return;
    };
    match function.kind() {
        "identifier" => {
            let callee = node_text(function, src);
            out.relate_enclosing(callee, RelationKind::Call, Confidence::Syntactic, node);
            // Capitalised bare call: most likely a constructor.
            if callee.starts_with(|c: char| c.is_ascii_uppercase()) {
                out.relate_enclosing(callee, RelationKind::Instantiates, Confidence::Heuristic, node);
            }
        }
        "attribute" => {
            if let Some(method) = field_text(function, "attribute", src) {
                out.relate_enclosing(method, RelationKind::Call, Confidence::Syntactic, node);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, Relation};

    const SERVICE: &str = r#"import os
from app.models import User, Order
from .utils import *

@app.get("/users/{user_id}")
def get_user(user_id: int) -> User:
    return fetch_user(user_id)

class UserService(BaseService, metaclass=Meta):
    def __init__(self, repo):
        self.repo = repo

    @staticmethod
    def build(data):
        return User(data)

    @classmethod
    def default(cls):
        return cls()

    async def load(self, uid):
        def helper():
            return self.repo.find(uid)
        return helper()

async def main():
    await UserService.default().load(1)
"#;

    fn extract(source: &str) -> FileExtraction {
        let file = SourceFile::new("app/service.py", source, Language::Python);
        PythonExtractor.extract(&file).unwrap()
    }

    fn find<'a>(chunks: &'a [Chunk], name: &str) -> &'a Chunk {
        chunks.iter().find(|c| c.name == name).unwrap()
    }

    fn has(relations: &[Relation], from: &str, to: &str, kind: RelationKind) -> bool {
        relations
            .iter()
            .any(|r| r.from == from && r.to == to && r.kind == kind)
    }

    #[test]
    fn chunk_kinds_follow_class_membership_and_decorators() {
        let out = extract(SERVICE);
        let kinds: Vec<(&str, ChunkKind)> =
            out.chunks.iter().map(|c| (c.name.as_str(), c.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("get_user", ChunkKind::Function),
                ("UserService", ChunkKind::Class),
                ("__init__", ChunkKind::Method),
                ("build", ChunkKind::StaticMethod),
                ("default", ChunkKind::ClassMethod),
                ("load", ChunkKind::AsyncMethod),
                ("helper", ChunkKind::Function),
                ("main", ChunkKind::AsyncFunction),
            ]
        );
    }

    #[test]
    fn decorated_definition_spans_decorators() {
        let out = extract(SERVICE);
        let get_user = find(&out.chunks, "get_user");
        assert_eq!(get_user.id, "app/service.py::get_user");
        assert_eq!((get_user.start_line, get_user.end_line), (5, 7));
        assert_eq!(get_user.decorators, vec![r#"@app.get("/users/{user_id}")"#]);
        assert!(get_user.code_text.starts_with("@app.get"));
        assert_eq!(get_user.parameters, vec!["user_id"]);

        let load = find(&out.chunks, "load");
        assert_eq!(load.parameters, vec!["self", "uid"]);
    }

    #[test]
    fn nested_chunks_stay_within_parent_range() {
        let out = extract(SERVICE);
        let class = find(&out.chunks, "UserService");
        let load = find(&out.chunks, "load");
        let helper = find(&out.chunks, "helper");
        assert_eq!((class.start_line, class.end_line), (9, 24));
        assert!(class.start_line <= load.start_line && load.end_line <= class.end_line);
        assert!(load.start_line <= helper.start_line && helper.end_line <= load.end_line);
        assert!(out.chunks.iter().all(|c| c.start_line <= c.end_line));
    }

    #[test]
    fn imports_are_attributed_to_the_file() {
        let out = extract(SERVICE);
        assert!(has(&out.relations, "service.py", "os", RelationKind::Import));
        assert!(has(&out.relations, "service.py", "app.models.User", RelationKind::Import));
        assert!(has(&out.relations, "service.py", "app.models.Order", RelationKind::Import));
        assert!(has(&out.relations, "service.py", ".utils.*", RelationKind::Import));
    }

    #[test]
    fn class_heritage_skips_keyword_arguments() {
        let out = extract(SERVICE);
        assert!(has(&out.relations, "UserService", "BaseService", RelationKind::Inherits));
        assert!(!has(&out.relations, "UserService", "Meta", RelationKind::Inherits));
    }

    #[test]
    fn calls_go_to_the_smallest_enclosing_chunk() {
        let out = extract(SERVICE);
        assert!(has(&out.relations, "get_user", "fetch_user", RelationKind::Call));
        assert!(has(&out.relations, "helper", "find", RelationKind::Call));
        assert!(has(&out.relations, "load", "helper", RelationKind::Call));
        assert!(!has(&out.relations, "load", "find", RelationKind::Call));
        assert!(has(&out.relations, "main", "load", RelationKind::Call));
        assert!(has(&out.relations, "main", "default", RelationKind::Call));
    }

    #[test]
    fn capitalised_calls_are_heuristic_instantiations() {
        let out = extract(SERVICE);
        let inst = out
            .relations
            .iter()
            .find(|r| r.kind == RelationKind::Instantiates)
            .unwrap();
        assert_eq!((inst.from.as_str(), inst.to.as_str()), ("build", "User"));
        assert_eq!(inst.confidence, Confidence::Heuristic);
        assert!(!has(&out.relations, "default", "cls", RelationKind::Instantiates));
    }

    #[test]
    fn decorators_returns_and_parameters() {
        let out = extract(SERVICE);
        assert!(has(&out.relations, "get_user", "get", RelationKind::DecoratedBy));
        assert!(has(&out.relations, "build", "staticmethod", RelationKind::DecoratedBy));
        assert!(has(&out.relations, "get_user", "User", RelationKind::Returns));
        assert!(has(&out.relations, "get_user", "int", RelationKind::Parameter));
        // Decorator arguments never become calls.
        assert!(!out
            .relations
            .iter()
            .any(|r| r.kind == RelationKind::Call && r.to == "get"));
    }

    #[test]
    fn file_without_definitions_gets_a_module_chunk() {
        let out = extract("X = 1\nprint(X)\n");
        assert_eq!(out.chunks.len(), 1);
        let module = &out.chunks[0];
        assert_eq!(module.kind, ChunkKind::Module);
        assert_eq!(module.name, "service");
        assert_eq!((module.start_line, module.end_line), (1, 2));
        assert!(has(&out.relations, "service", "print", RelationKind::Call));
    }

    #[test]
    fn malformed_source_is_a_parse_error() {
        let file = SourceFile::new("bad.py", "class (:\n  def\n", Language::Python);
        assert!(PythonExtractor.extract(&file).is_err());
    }

    #[test]
    fn annotation_names() {
        assert_eq!(annotation_name("Optional[User]"), Some("Optional"));
        assert_eq!(annotation_name("'models.User'"), Some("User"));
        assert_eq!(annotation_name("int | None"), Some("int"));
        assert_eq!(annotation_name("None"), None);
    }
}
