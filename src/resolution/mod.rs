//! Cross-language resolution: route equivalence and HTTP bridge inference.

pub mod bridge;
pub mod routes;

pub use bridge::{score_methods, BridgeInferencer, MIN_BRIDGE_SCORE};
pub use routes::{join_routes, match_routes, normalize_route, routes_equivalent, RouteMatch};
