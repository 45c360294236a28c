//! Payloads for the narrative and diagram collaborators.
//!
//! A [`SubgraphPayload`] is the induced subgraph of a node-id list: the
//! chunk attributes of every listed node plus every edge running between
//! two listed nodes. Rendering it is the collaborator's job; `to_mermaid`
//! covers the common diagram case.

use std::collections::HashSet;
use std::fmt::Write;

use serde::Serialize;

use crate::graph::store::CodeGraph;
use crate::types::{ChunkKind, Confidence, HttpBridge, RelationKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodePayload {
    pub id: String,
    pub name: String,
    pub kind: ChunkKind,
    pub language: String,
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub parameters: Vec<String>,
    pub decorators: Vec<String>,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgePayload {
    pub from: String,
    pub to: String,
    pub kind: RelationKind,
    pub confidence: Confidence,
    pub source_language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<HttpBridge>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubgraphPayload {
    pub nodes: Vec<NodePayload>,
    pub edges: Vec<EdgePayload>,
}

impl SubgraphPayload {
    /// Nodes in input order (absent ids and repeats skipped) and the edges between them.
    pub fn from_ids(graph: &CodeGraph, ids: &[String]) -> Self {
        let mut included: HashSet<&str> = HashSet::new();
        let mut nodes = Vec::new();

        for id in ids {
            let Some(chunk) = graph.node(id) else {
                continue;
            };
            if !included.insert(chunk.id.as_str()) {
                continue;
            }
            nodes.push(NodePayload {
                id: chunk.id.clone(),
                name: chunk.name.clone(),
                kind: chunk.kind,
                language: chunk.language.to_string(),
                file: chunk.file_path.clone(),
                start_line: chunk.start_line,
                end_line: chunk.end_line,
                parameters: chunk.parameters.clone(),
                decorators: chunk.decorators.clone(),
                code: chunk.code_text.clone(),
            });
        }

        let edges = graph
            .edges_within(&included)
            .into_iter()
            .map(|r| EdgePayload {
                from: r.from.clone(),
                to: r.to.clone(),
                kind: r.kind,
                confidence: r.confidence,
                source_language: r.language_label().to_string(),
                bridge: r.bridge.clone(),
            })
            .collect();

        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Render as a Mermaid `flowchart TD`.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("flowchart TD");

        for node in &self.nodes {
            let params = if node.parameters.is_empty() {
                "—".to_string()
            } else {
                node.parameters.join(", ")
            };
            let label = format!(
                "<b>{}</b><br/><small>({})</small><br/><small>{}</small><br/><small>[{}]</small>",
                escape_label(&node.name),
                escape_label(&params),
                escape_label(&node.file),
                node.kind
            );
            let _ = write!(out, "\n    {}[\"{}\"]", mermaid_id(&node.id), label);
        }

        for edge in &self.edges {
            let _ = write!(
                out,
                "\n    {} -->|{}| {}",
                mermaid_id(&edge.from),
                edge.kind,
                mermaid_id(&edge.to)
            );
        }

        out.push('\n');
        out
    }
}

/// Mermaid node ids allow only word characters.
fn mermaid_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn escape_label(text: &str) -> String {
    text.replace('"', "#quot;")
        .replace('<', "#lt;")
        .replace('>', "#gt;")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::store::tests::graph_of;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn induced_subgraph_keeps_order_and_inner_edges() {
        let graph = graph_of(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "b")]);
        let payload = SubgraphPayload::from_ids(&graph, &ids(&["b", "ghost", "a", "b"]));

        let names: Vec<&str> = payload.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(payload.edges.len(), 2);
        assert!(payload.edges.iter().all(|e| e.from == "a" && e.to == "b"));
        assert_eq!(payload.edges[0].source_language, "python");
    }

    #[test]
    fn mermaid_renders_nodes_and_labelled_edges() {
        let graph = graph_of(&["svc/auth.py::login", "svc/db.py::query"], &[]);
        let mut payload = SubgraphPayload::from_ids(
            &graph,
            &ids(&["svc/auth.py::login", "svc/db.py::query"]),
        );
        payload.edges.push(EdgePayload {
            from: "svc/auth.py::login".to_string(),
            to: "svc/db.py::query".to_string(),
            kind: RelationKind::Call,
            confidence: Confidence::Syntactic,
            source_language: "python".to_string(),
            bridge: None,
        });

        let mermaid = payload.to_mermaid();
        assert!(mermaid.starts_with("flowchart TD\n"));
        assert!(mermaid.contains("svc_auth_py__login[\"<b>svc/auth.py::login</b>"));
        assert!(mermaid.contains("<small>(—)</small>"));
        assert!(mermaid.contains("<small>[function]</small>"));
        assert!(mermaid.contains("svc_auth_py__login -->|call| svc_db_py__query"));
    }

    #[test]
    fn empty_ids_give_empty_payload() {
        let graph = graph_of(&["a"], &[]);
        let payload = SubgraphPayload::from_ids(&graph, &[]);
        assert!(payload.is_empty());
        assert_eq!(payload.to_mermaid(), "flowchart TD\n");
    }
}
