//! HTTP route normalization and equivalence.
//!
//! Two routes are equivalent when one of three tiers holds, tried in order:
//!
//! | Tier          | Rule                                                   |
//! |---------------|--------------------------------------------------------|
//! | Exact         | equal after case-folding and trimming `/`              |
//! | Suffix        | one route's segments end the other's                   |
//! | Parameterized | equal after parameter segments become a wildcard       |
//!
//! Parameter segments are `{id}`, `:id`, `<id>` and `${id}`.

use serde::Serialize;

/// Which equivalence tier matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMatch {
    Exact,
    Suffix,
    Parameterized,
}

const WILDCARD: &str = "*";

/// Case-fold, drop any query string or fragment, trim surrounding `/`.
pub fn normalize_route(route: &str) -> String {
    let route = route.trim();
    let path = route.split(['?', '#']).next().unwrap_or(route);
    path.trim_matches('/').to_lowercase()
}

/// Non-empty `/`-separated segments of a normalized route.
fn segments(normalized: &str) -> Vec<&str> {
    normalized.split('/').filter(|s| !s.is_empty()).collect()
}

fn is_parameter(segment: &str) -> bool {
    (segment.starts_with('{') && segment.ends_with('}'))
        || (segment.starts_with('<') && segment.ends_with('>'))
        || segment.starts_with(':')
        || segment.contains("${")
}

/// Test two routes for equivalence, returning the first tier that holds.
pub fn match_routes(a: &str, b: &str) -> Option<RouteMatch> {
    let a = normalize_route(a);
    let b = normalize_route(b);

    if a == b {
        return Some(RouteMatch::Exact);
    }

    let seg_a = segments(&a);
    let seg_b = segments(&b);
    if seg_a.is_empty() || seg_b.is_empty() {
        return None;
    }

    let (short, long) = if seg_a.len() <= seg_b.len() {
        (&seg_a, &seg_b)
    } else {
        (&seg_b, &seg_a)
    };
    if long.ends_with(short) {
        return Some(RouteMatch::Suffix);
    }

    let wild = |segs: &[&str]| -> Vec<String> {
        segs.iter()
            .map(|s| if is_parameter(s) { WILDCARD.to_string() } else { s.to_string() })
            .collect()
    };
    if wild(&seg_a) == wild(&seg_b) {
        return Some(RouteMatch::Parameterized);
    }

    None
}

pub fn routes_equivalent(a: &str, b: &str) -> bool {
    match_routes(a, b).is_some()
}

/// Join a class-level prefix and a handler route: `/api` + `users` → `/api/users`.
pub fn join_routes(prefix: &str, route: &str) -> String {
    let prefix = prefix.trim().trim_end_matches('/');
    let route = route.trim().trim_start_matches('/');
    match (prefix.is_empty(), route.is_empty()) {
        (true, _) => format!("/{route}"),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{route}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
