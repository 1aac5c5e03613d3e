//! Route lookup.
//!
//! # Design Decisions
//! - Immutable after construction; replaced wholesale on reload
//! - O(n) scan in priority order (route tables are small)
//! - An empty table throttles everything

use axum::body::Body;
use axum::http::Request;

use crate::config::RouteConfig;
use crate::routing::matcher::{AndMatcher, HostMatcher, Matcher, PathPrefixMatcher};

#[derive(Debug)]
struct CompiledRoute {
    name: String,
    priority: u32,
    matcher: AndMatcher,
}

/// Compiled set of throttled routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    /// Compile routes, highest priority first. Ties keep config order.
    pub fn from_config(configs: &[RouteConfig]) -> Self {
        let mut routes: Vec<CompiledRoute> = configs
            .iter()
            .map(|config| {
                let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
                if let Some(host) = &config.host {
                    matchers.push(Box::new(HostMatcher::new(host.clone())));
                }
                if let Some(prefix) = &config.path_prefix {
                    matchers.push(Box::new(PathPrefixMatcher::new(prefix.clone())));
                }
                CompiledRoute {
                    name: config.name.clone(),
                    priority: config.priority,
                    matcher: AndMatcher::new(matchers),
                }
            })
            .collect();
        routes.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { routes }
    }

    /// Name of the first matching route.
    pub fn match_request(&self, req: &Request<Body>) -> Option<&str> {
        self.routes
            .iter()
            .find(|r| r.matcher.matches(req))
            .map(|r| r.name.as_str())
    }

    /// Whether the throttle applies to this request.
    pub fn is_throttled(&self, req: &Request<Body>) -> bool {
        self.routes.is_empty() || self.match_request(req).is_some()
    }

    /// Route names in match order.
    pub fn names(&self) -> Vec<String> {
        self.routes.iter().map(|r| r.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
