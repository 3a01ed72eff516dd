//! Router core module - hot path for request routing.
//!
//! Routes are added and removed while definitions are bound, so the table is
//! a plain vector of compiled patterns kept in specificity order. Matching is
//! a linear scan; hosts carry a handful of routes per bound definition.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum number of path/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>` because they come from the route table and are
/// shared by every match; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// One installed entry point on the host stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    pub method: Method,
    /// Full pattern including the base path, e.g. `/books/{service}/{id}`
    /// or `/books/:service/:id`
    pub path_pattern: String,
    pub handler_name: String,
    pub base_path: String,
}

/// Result of successfully matching a request path to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteMeta>,
    /// Path parameters extracted from the URL, percent-decoded
    pub path_params: ParamVec,
    pub handler_name: String,
    /// Query string parameters (populated by the server)
    pub query_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics when a name repeats.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone)]
struct CompiledRoute {
    regex: Regex,
    params: Vec<Arc<str>>,
    literal_segments: usize,
    meta: Arc<RouteMeta>,
}

/// Mutable routing table of the host stack.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<CompiledRoute>,
}

impl Router {
    /// Build a router from a list of routes.
    ///
    /// Routes whose pattern does not compile are skipped with a warning.
    #[must_use]
    pub fn new(routes: Vec<RouteMeta>) -> Self {
        let mut router = Self::default();
        for route in routes {
            if let Err(e) = router.add_route(route) {
                warn!(error = %e, "Skipping route with invalid pattern");
            }
        }
        info!(
            routes_count = router.routes.len(),
            "Routing table loaded"
        );
        router
    }

    /// Add a route, replacing any existing route with the same method and pattern.
    pub fn add_route(&mut self, meta: RouteMeta) -> Result<(), regex::Error> {
        let (regex, params) = Self::path_to_regex(&meta.path_pattern)?;
        let literal_segments = meta
            .path_pattern
            .split('/')
            .filter(|s| !s.is_empty() && !is_param_segment(s))
            .count();

        self.routes.retain(|r| {
            !(r.meta.method == meta.method && r.meta.path_pattern == meta.path_pattern)
        });

        debug!(
            method = %meta.method,
            path_pattern = %meta.path_pattern,
            handler_name = %meta.handler_name,
            "Route added"
        );

        self.routes.push(CompiledRoute {
            regex,
            params: params.into_iter().map(Arc::from).collect(),
            literal_segments,
            meta: Arc::new(meta),
        });
        // most literal segments first, so a bound base path beats the root
        self.routes
            .sort_by(|a, b| b.literal_segments.cmp(&a.literal_segments));
        Ok(())
    }

    /// Remove every route dispatching to `handler_name`. Returns how many were removed.
    pub fn remove_handler(&mut self, handler_name: &str) -> usize {
        let before = self.routes.len();
        self.routes.retain(|r| r.meta.handler_name != handler_name);
        before - self.routes.len()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Installed routes in match order.
    pub fn routes(&self) -> Vec<Arc<RouteMeta>> {
        self.routes.iter().map(|r| Arc::clone(&r.meta)).collect()
    }

    /// All registered path patterns, deduplicated, in match order.
    #[must_use]
    pub fn get_all_path_patterns(&self) -> Vec<String> {
        let mut patterns: Vec<String> = Vec::new();
        for r in &self.routes {
            if !patterns.contains(&r.meta.path_pattern) {
                patterns.push(r.meta.path_pattern.clone());
            }
        }
        patterns
    }

    /// Match an HTTP request to a route.
    ///
    /// A trailing slash on the request path is ignored.
    #[must_use]
    pub fn route(&self, method: Method, path: &str) -> Option<RouteMatch> {
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };

        debug!(method = %method, path = %path, "Route match attempt");

        for r in &self.routes {
            if r.meta.method != method {
                continue;
            }
            let Some(caps) = r.regex.captures(path) else {
                continue;
            };

            let mut path_params = ParamVec::new();
            for (i, name) in r.params.iter().enumerate() {
                if let Some(m) = caps.get(i + 1) {
                    let value = urlencoding::decode(m.as_str())
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| m.as_str().to_string());
                    path_params.push((Arc::clone(name), value));
                }
            }

            info!(
                method = %method,
                path = %path,
                handler_name = %r.meta.handler_name,
                route_pattern = %r.meta.path_pattern,
                path_params = ?path_params,
                "Route matched"
            );

            return Some(RouteMatch {
                route: Arc::clone(&r.meta),
                path_params,
                handler_name: r.meta.handler_name.clone(),
                query_params: ParamVec::new(),
            });
        }

        warn!(method = %method, path = %path, "No route matched");
        None
    }

    /// Convert a path pattern to a regex and extract parameter names.
    ///
    /// Both `{name}` and `:name` segments become single-segment captures;
    /// literal segments are matched exactly.
    pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<String>), regex::Error> {
        if path == "/" || path.is_empty() {
            return Ok((Regex::new(r"^/$")?, Vec::new()));
        }

        let mut pattern = String::with_capacity(path.len() + 8);
        pattern.push('^');
        let mut param_names = Vec::new();

        for segment in path.split('/') {
            if segment.is_empty() {
                continue;
            }
            if is_param_segment(segment) {
                pattern.push_str("/([^/]+)");
                param_names.push(param_name(segment).to_string());
            } else {
                pattern.push('/');
                pattern.push_str(&regex::escape(segment));
            }
        }

        pattern.push('$');
        Ok((Regex::new(&pattern)?, param_names))
    }
}

fn is_param_segment(segment: &str) -> bool {
    (segment.starts_with('{') && segment.ends_with('}')) || segment.starts_with(':')
}

fn param_name(segment: &str) -> &str {
    segment
        .trim_start_matches(':')
        .trim_start_matches('{')
        .trim_end_matches('}')
}
