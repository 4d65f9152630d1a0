//! # Route Table
//!
//! Stores registered webhook routes and resolves an inbound `(method, path,
//! payload)` triple to the best match.
//!
//! ## Scoring
//!
//! | Condition                                   | Score |
//! |---------------------------------------------|-------|
//! | method differs (case-insensitive)           | 0     |
//! | path equals the route path                  | +100  |
//! | path matches the `:param` pattern           | +50   |
//! | payload supplied and matcher returns `true` | +25   |
//!
//! Candidates scoring 0 are excluded. The winner is chosen by priority
//! (descending), then score (descending), then registration order.
//!
//! Results of payload-less lookups are cached under `METHOD:path`; the cache is
//! cleared on every mutation. Lookups that carry a payload always recompute.

use super::route::{PayloadMatcher, Route, RouteMatch};
use crate::constants::{EXACT_PATH_SCORE, PARAM_PREFIX, PATTERN_PATH_SCORE, PAYLOAD_MATCH_SCORE};
use crate::logging::log_route_operation;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Cache payload-less resolutions per `METHOD:path`
    pub cache_enabled: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
        }
    }
}

#[derive(Default)]
struct TableState {
    /// Kept sorted by priority, highest first; equal priorities keep registration order
    routes: Vec<Route>,
    cache: HashMap<String, RouteMatch>,
    /// Bumped on every mutation so resolutions computed against stale routes are not cached
    generation: u64,
}

pub struct RouteTable {
    state: RwLock<TableState>,
    config: RouterConfig,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            state: RwLock::new(TableState::default()),
            config,
        }
    }

    /// Register a route. Duplicate registrations are kept and all take part in matching.
    pub fn register(&self, route: Route) {
        log_route_operation(
            "register",
            &route.method,
            &route.path,
            Some(&format!("type={} priority={}", route.route_type, route.priority)),
        );

        let mut state = self.state.write();
        state.routes.push(route);
        // Vec::sort_by is stable, preserving registration order within a priority
        state.routes.sort_by(|a, b| b.priority.cmp(&a.priority));
        state.cache.clear();
        state.generation += 1;
    }

    /// Remove every route registered under exactly this path and method.
    /// Returns the number of routes removed.
    pub fn unregister(&self, path: &str, method: &str) -> usize {
        let mut state = self.state.write();
        let before = state.routes.len();
        state
            .routes
            .retain(|r| !(r.path == path && r.method.eq_ignore_ascii_case(method)));
        let removed = before - state.routes.len();
        state.cache.clear();
        state.generation += 1;
        drop(state);

        if removed > 0 {
            log_route_operation("unregister", method, path, Some(&format!("removed={removed}")));
        } else {
            warn!(method = %method, path = %path, "Attempted to unregister non-existent route");
        }
        removed
    }

    /// Resolve a request to the best-matching route, or `None` when nothing matches
    pub fn resolve(&self, path: &str, method: &str, payload: Option<&Value>) -> Option<RouteMatch> {
        if payload.is_some() || !self.config.cache_enabled {
            let state = self.state.read();
            return best_match(&state.routes, path, method, payload);
        }

        let key = cache_key(method, path);
        let state = self.state.read();
        if let Some(hit) = state.cache.get(&key) {
            debug!(key = %key, "Route cache hit");
            return Some(hit.clone());
        }

        let result = best_match(&state.routes, path, method, None);
        let generation = state.generation;
        drop(state);

        if let Some(route_match) = &result {
            let mut state = self.state.write();
            if state.generation == generation {
                state.cache.insert(key, route_match.clone());
            }
        }

        result
    }

    /// Snapshot of the registered routes in matching order
    pub fn routes(&self) -> Vec<Route> {
        self.state.read().routes.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().routes.is_empty()
    }

    pub fn cache_len(&self) -> usize {
        self.state.read().cache.len()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_key(method: &str, path: &str) -> String {
    format!("{}:{}", method.to_ascii_uppercase(), path)
}

fn best_match(
    routes: &[Route],
    path: &str,
    method: &str,
    payload: Option<&Value>,
) -> Option<RouteMatch> {
    let mut candidates: Vec<(&Route, u32)> = routes
        .iter()
        .map(|route| (route, score_route(route, path, method, payload)))
        .filter(|(_, score)| *score > 0)
        .collect();

    candidates.sort_by(|(a, a_score), (b, b_score)| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b_score.cmp(a_score))
    });

    candidates
        .first()
        .map(|(route, score)| RouteMatch::from_route(route, *score))
}

fn score_route(route: &Route, path: &str, method: &str, payload: Option<&Value>) -> u32 {
    if !route.method.eq_ignore_ascii_case(method) {
        return 0;
    }

    let mut score = if route.path == path {
        EXACT_PATH_SCORE
    } else if pattern_matches(&route.path, path) {
        PATTERN_PATH_SCORE
    } else {
        return 0;
    };

    if let (Some(matcher), Some(payload)) = (&route.payload_matcher, payload) {
        if evaluate_matcher(matcher, payload, route) {
            score += PAYLOAD_MATCH_SCORE;
        }
    }

    score
}

/// A panicking matcher is treated as a non-match
fn evaluate_matcher(matcher: &PayloadMatcher, payload: &Value, route: &Route) -> bool {
    match catch_unwind(AssertUnwindSafe(|| matcher(payload))) {
        Ok(matched) => matched,
        Err(_) => {
            warn!(
                method = %route.method,
                path = %route.path,
                "Payload matcher panicked; treating as non-match"
            );
            false
        }
    }
}

/// Whether `path` matches `pattern`, where `:name` segments match any single segment
pub fn pattern_matches(pattern: &str, path: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    let path_segments: Vec<&str> = path.split('/').collect();

    pattern_segments.len() == path_segments.len()
        && pattern_segments
            .iter()
            .zip(path_segments.iter())
            .all(|(pat, seg)| pat.starts_with(PARAM_PREFIX) || pat == seg)
}

/// Extract `:param` values from `path` according to `pattern`.
/// Returns `None` when the path does not match the pattern.
pub fn extract_params(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    if !pattern_matches(pattern, path) {
        return None;
    }

    let params = pattern
        .split('/')
        .zip(path.split('/'))
        .filter_map(|(pat, seg)| {
            pat.strip_prefix(PARAM_PREFIX)
                .map(|name| (name.to_string(), seg.to_string()))
        })
        .collect();

    Some(params)
}
