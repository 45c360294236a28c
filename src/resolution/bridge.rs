//! Cross-language HTTP bridge inference.
//!
//! Links frontend network-call sites (`fetch`, `axios.get`, ...) to backend
//! handler chunks (`@GetMapping`, `@app.route`, ...) with `http_call`
//! relations. Route declarations are recognised by a small table of rules;
//! each rule is tried first against a chunk's captured decorators and then,
//! as a fallback, against its raw text.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, info};

use super::routes::{join_routes, routes_equivalent};
use crate::config::BridgeConfig;
use crate::error::{RepoMindError, Result};
use crate::types::{Chunk, Confidence, HttpBridge, HttpMethod, Relation, RelationKind};

/// Bridges scoring below this are dropped.
pub const MIN_BRIDGE_SCORE: f64 = 0.5;

// ---------------------------------------------------------------------------
// Route rules
// ---------------------------------------------------------------------------

/// One backend route-declaration shape.
struct RouteRule {
    name: &'static str,
    /// Pattern without the leading `@`; must define `route` and may define `verb`.
    body: &'static str,
    /// Look ahead for a `methods=[...]` literal when the rule has no verb.
    recover_method: bool,
}

const ROUTE_RULES: &[RouteRule] = &[
    RouteRule {
        name: "spring-mapping",
        body: r#"(?P<verb>Get|Post|Put|Delete|Patch)Mapping\b(?:\s*\(\s*(?:(?:value|path)\s*=\s*)?\{?\s*["'](?P<route>[^"']*)["'])?"#,
        recover_method: false,
    },
    RouteRule {
        name: "request-mapping",
        body: r#"RequestMapping\b(?:\s*\(\s*(?:(?:value|path)\s*=\s*)?\{?\s*["'](?P<route>[^"']*)["'])?"#,
        recover_method: true,
    },
    RouteRule {
        name: "verb-registration",
        body: r#"[A-Za-z_][\w.]*\.(?P<verb>get|post|put|delete|patch)\s*\(\s*["'](?P<route>[^"']*)["']"#,
        recover_method: false,
    },
    RouteRule {
        name: "route-registration",
        body: r#"[A-Za-z_][\w.]*\.route\s*\(\s*["'](?P<route>[^"']*)["']"#,
        recover_method: true,
    },
];

/// A rule compiled twice: anchored for decorator strings, `@`-prefixed for raw text.
struct CompiledRule {
    name: &'static str,
    decorator: Regex,
    scan: Regex,
    recover_method: bool,
}

static COMPILED_RULES: Lazy<Vec<CompiledRule>> = Lazy::new(|| {
    ROUTE_RULES
        .iter()
        .map(|rule| CompiledRule {
            name: rule.name,
            decorator: Regex::new(&format!("^@?{}", rule.body)).expect("valid route rule"),
            scan: Regex::new(&format!("@{}", rule.body)).expect("valid route rule"),
            recover_method: rule.recover_method,
        })
        .collect()
});

static METHODS_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"methods?\s*=\s*[\[{(]?\s*(?:RequestMethod\.)?["']?(?P<verb>[A-Za-z]+)"#)
        .expect("valid methods pattern")
});

static FETCH_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bfetch\s*\(\s*['"`](?P<route>[^'"`]*)['"`]"#).expect("valid fetch pattern")
});

static FETCH_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"method\s*:\s*['"`](?P<verb>[A-Za-z]+)['"`]"#).expect("valid fetch method pattern")
});

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// A literal-route network call found in frontend code.
#[derive(Debug, Clone)]
pub struct FrontendCall<'c> {
    pub caller: &'c Chunk,
    pub route: String,
    pub method: HttpMethod,
    /// `fetch` or the client identifier as written.
    pub api_type: String,
    pub line: u32,
}

/// A backend chunk that declares an HTTP route.
#[derive(Debug, Clone)]
pub struct BackendHandler<'c> {
    pub handler: &'c Chunk,
    /// Declared route with any class-level prefix applied.
    pub route: String,
    pub method: HttpMethod,
    pub rule: &'static str,
}

struct RouteHit {
    rule: &'static str,
    /// `None` when the declaration carries no route literal (bare `@GetMapping`).
    route: Option<String>,
    method: HttpMethod,
}

// ---------------------------------------------------------------------------
// BridgeInferencer
// ---------------------------------------------------------------------------

/// Infers frontend → backend `http_call` relations from a batch of chunks.
///
/// Stateless apart from its compiled client pattern; `infer` is a pure
/// function of its input.
pub struct BridgeInferencer {
    client_call: Option<Regex>,
    fetch_method_window: usize,
    route_methods_window: usize,
}

impl BridgeInferencer {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let clients: Vec<String> = config
            .http_clients
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(regex::escape)
            .collect();

        let client_call = if clients.is_empty() {
            None
        } else {
            let pattern = format!(
                r#"(?:^|[^\w$])(?P<client>{})\s*\.\s*(?P<verb>get|post|put|delete|patch|call)\s*\(\s*['"`](?P<route>[^'"`]*)['"`]"#,
                clients.join("|")
            );
            let re = Regex::new(&pattern)
                .map_err(|e| RepoMindError::Config(format!("invalid http client pattern: {e}")))?;
            Some(re)
        };

        Ok(Self {
            client_call,
            fetch_method_window: config.fetch_method_window,
            route_methods_window: config.route_methods_window,
        })
    }

    /// Produce one `http_call` relation per matched frontend call site.
    pub fn infer(&self, chunks: &[Chunk]) -> Vec<Relation> {
        let calls = self.frontend_calls(chunks);
        let handlers = self.backend_handlers(chunks);
        debug!(
            calls = calls.len(),
            handlers = handlers.len(),
            "bridge candidates"
        );

        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        let mut relations = Vec::new();

        for call in &calls {
            let mut best: Option<(&BackendHandler, f64)> = None;
            for handler in &handlers {
                if seen.contains(&(call.caller.id.as_str(), handler.handler.id.as_str())) {
                    continue;
                }
                if !routes_equivalent(&call.route, &handler.route) {
                    continue;
                }
                let Some(score) = score_methods(call.method, handler.method) else {
                    continue;
                };
                if score < MIN_BRIDGE_SCORE {
                    continue;
                }
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((handler, score));
                }
            }

            if let Some((handler, score)) = best {
                seen.insert((call.caller.id.as_str(), handler.handler.id.as_str()));
                relations.push(bridge_relation(call, handler, score));
            }
        }

        info!(bridges = relations.len(), "inferred http bridges");
        relations
    }

    // -- frontend -----------------------------------------------------------

    /// Literal-route calls in frontend chunks, ordered by chunk then position.
    pub fn frontend_calls<'c>(&self, chunks: &'c [Chunk]) -> Vec<FrontendCall<'c>> {
        let by_file = group_by_file(chunks);
        let mut calls = Vec::new();

        for chunk in chunks.iter().filter(|c| c.language.is_frontend()) {
            let siblings = by_file.get(chunk.file_path.as_str());
            let owns = |offset: usize| owns_offset(chunk, siblings, offset);
            let text = chunk.code_text.as_str();
            let mut found: Vec<(usize, FrontendCall<'c>)> = Vec::new();

            for caps in FETCH_CALL.captures_iter(text) {
                let (start, end) = span(&caps);
                if !owns(start) {
                    continue;
                }
                let method = FETCH_METHOD
                    .captures(window(text, end, self.fetch_method_window))
                    .map(|m| HttpMethod::parse(&m["verb"]))
                    .unwrap_or(HttpMethod::Unknown);
                found.push((
                    start,
                    FrontendCall {
                        caller: chunk,
                        route: caps["route"].to_string(),
                        method,
                        api_type: "fetch".to_string(),
                        line: line_at(chunk, start),
                    },
                ));
            }

            if let Some(client_call) = &self.client_call {
                for caps in client_call.captures_iter(text) {
                    let start = caps.name("client").map(|m| m.start()).unwrap_or(0);
                    if !owns(start) {
                        continue;
                    }
                    let verb = &caps["verb"];
                    let method = if verb == "call" {
                        HttpMethod::Unknown
                    } else {
                        HttpMethod::parse(verb)
                    };
                    found.push((
                        start,
                        FrontendCall {
                            caller: chunk,
                            route: caps["route"].to_string(),
                            method,
                            api_type: caps["client"].to_string(),
                            line: line_at(chunk, start),
                        },
                    ));
                }
            }

            found.sort_by_key(|(start, _)| *start);
            calls.extend(found.into_iter().map(|(_, call)| call));
        }

        calls
    }

    // -- backend ------------------------------------------------------------

    /// Route-declaring backend chunks in input order.
    ///
    /// Container chunks (classes, interfaces, ...) never become handlers;
    /// their routes act as prefixes for the members they enclose.
    pub fn backend_handlers<'c>(&self, chunks: &'c [Chunk]) -> Vec<BackendHandler<'c>> {
        let by_file = group_by_file(chunks);

        let prefixes: Vec<(&Chunk, String)> = chunks
            .iter()
            .filter(|c| c.language.is_backend() && c.kind.is_container())
            .filter_map(|c| {
                self.decorator_routes(c)
                    .into_iter()
                    .next()
                    .and_then(|hit| hit.route)
                    .map(|route| (c, route))
            })
            .collect();

        let mut handlers = Vec::new();
        for chunk in chunks
            .iter()
            .filter(|c| c.language.is_backend() && !c.kind.is_container())
        {
            let mut hits = self.decorator_routes(chunk);
            if hits.is_empty() {
                hits = self.scanned_routes(chunk, by_file.get(chunk.file_path.as_str()));
            }

            let prefix = enclosing_prefix(chunk, &prefixes);
            for hit in hits {
                let route = match (prefix, hit.route) {
                    (Some(p), Some(route)) => join_routes(p, &route),
                    (Some(p), None) => p.to_string(),
                    (None, Some(route)) => route,
                    (None, None) => continue,
                };
                handlers.push(BackendHandler {
                    handler: chunk,
                    route,
                    method: hit.method,
                    rule: hit.rule,
                });
            }
        }

        handlers
    }

    fn decorator_routes(&self, chunk: &Chunk) -> Vec<RouteHit> {
        let mut hits = Vec::new();
        for decorator in &chunk.decorators {
            let decorator = decorator.trim();
            for rule in COMPILED_RULES.iter() {
                if let Some(caps) = rule.decorator.captures(decorator) {
                    hits.push(self.route_hit(rule, &caps, decorator));
                    break;
                }
            }
        }
        hits
    }

    fn scanned_routes(&self, chunk: &Chunk, siblings: Option<&Vec<&Chunk>>) -> Vec<RouteHit> {
        let text = chunk.code_text.as_str();
        let mut found: Vec<(usize, RouteHit)> = Vec::new();
        for rule in COMPILED_RULES.iter() {
            for caps in rule.scan.captures_iter(text) {
                let (start, _) = span(&caps);
                if found.iter().any(|(s, _)| *s == start) || !owns_offset(chunk, siblings, start) {
                    continue;
                }
                found.push((start, self.route_hit(rule, &caps, text)));
            }
        }
        found.sort_by_key(|(start, _)| *start);
        found.into_iter().map(|(_, hit)| hit).collect()
    }

    fn route_hit(&self, rule: &CompiledRule, caps: &Captures, text: &str) -> RouteHit {
        let mut method = caps
            .name("verb")
            .map(|v| HttpMethod::parse(v.as_str()))
            .unwrap_or(HttpMethod::Unknown);

        if !method.is_known() && rule.recover_method {
            let (_, end) = span(caps);
            if let Some(m) = METHODS_LITERAL.captures(window(text, end, self.route_methods_window)) {
                method = HttpMethod::parse(&m["verb"]);
            }
        }

        RouteHit {
            rule: rule.name,
            route: caps.name("route").map(|r| r.as_str().to_string()),
            method,
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score a method pairing, or `None` when both are known and disagree.
pub fn score_methods(frontend: HttpMethod, backend: HttpMethod) -> Option<f64> {
    match (frontend.is_known(), backend.is_known()) {
        (true, true) if frontend == backend => Some(1.0),
        (true, true) => None,
        (true, false) => Some(0.75),
        _ => Some(0.5),
    }
}

fn bridge_relation(call: &FrontendCall, handler: &BackendHandler, score: f64) -> Relation {
    Relation {
        from: call.caller.id.clone(),
        to: handler.handler.id.clone(),
        kind: RelationKind::HttpCall,
        source_language: None,
        confidence: Confidence::from_bridge_score(score),
        line: Some(call.line),
        bridge: Some(HttpBridge {
            route: call.route.clone(),
            handler_route: handler.route.clone(),
            http_method: call.method,
            backend_method: handler.method,
            api_type: call.api_type.clone(),
            score,
        }),
    }
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

fn group_by_file(chunks: &[Chunk]) -> HashMap<&str, Vec<&Chunk>> {
    let mut by_file: HashMap<&str, Vec<&Chunk>> = HashMap::new();
    for chunk in chunks {
        by_file.entry(chunk.file_path.as_str()).or_default().push(chunk);
    }
    by_file
}

/// Whether the byte at `offset` of `chunk`'s text lies outside every chunk
/// nested inside it.
fn owns_offset(chunk: &Chunk, siblings: Option<&Vec<&Chunk>>, offset: usize) -> bool {
    let Some(siblings) = siblings else {
        return true;
    };
    !siblings.iter().any(|inner| {
        nested_range(chunk, inner).is_some_and(|(start, end)| start <= offset && offset < end)
    })
}

/// Byte range of `inner`'s text within `outer`'s, when `inner` is a strictly
/// smaller chunk nested inside `outer`.
fn nested_range(outer: &Chunk, inner: &Chunk) -> Option<(usize, usize)> {
    if std::ptr::eq(outer, inner)
        || inner.code_text.is_empty()
        || inner.code_text.len() >= outer.code_text.len()
        || inner.start_line < outer.start_line
        || inner.end_line > outer.end_line
    {
        return None;
    }
    outer
        .code_text
        .match_indices(inner.code_text.as_str())
        .map(|(start, _)| start)
        .find(|&start| line_at(outer, start) == inner.start_line)
        .map(|start| (start, start + inner.code_text.len()))
}

/// Route of the tightest route-declaring container enclosing `chunk`.
fn enclosing_prefix<'p>(chunk: &Chunk, prefixes: &'p [(&Chunk, String)]) -> Option<&'p str> {
    prefixes
        .iter()
        .filter(|(c, _)| {
            c.file_path == chunk.file_path
                && c.id != chunk.id
                && c.start_line <= chunk.start_line
                && chunk.end_line <= c.end_line
        })
        .max_by_key(|(c, _)| c.start_line)
        .map(|(_, route)| route.as_str())
}

fn span(caps: &Captures) -> (usize, usize) {
    caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0))
}

/// 1-based file line of a byte offset into a chunk's text.
fn line_at(chunk: &Chunk, offset: usize) -> u32 {
    let newlines = chunk.code_text[..offset].matches('\n').count() as u32;
    chunk.start_line + newlines
}

/// At most `len` bytes of `text` starting at `start`, cut on a char boundary.
fn window(text: &str, start: usize, len: usize) -> &str {
    let mut end = start.saturating_add(len).min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[start..end]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
