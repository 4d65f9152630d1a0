use crate::dispatcher::WebhookHandler;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Predicate over a verified payload used to refine route selection
pub type PayloadMatcher = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Category of the system a route feeds into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    Orchestration,
    Automation,
    #[default]
    Generic,
    Marketplace,
    Analytics,
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteType::Orchestration => "orchestration",
            RouteType::Automation => "automation",
            RouteType::Generic => "generic",
            RouteType::Marketplace => "marketplace",
            RouteType::Analytics => "analytics",
        };
        f.write_str(name)
    }
}

/// A registered (path pattern, method) mapping to a handler
#[derive(Clone)]
pub struct Route {
    pub path: String,
    /// Upper-cased HTTP method
    pub method: String,
    pub handler: Arc<dyn WebhookHandler>,
    pub route_type: RouteType,
    pub priority: i32,
    pub payload_matcher: Option<PayloadMatcher>,
}

impl Route {
    pub fn new(
        path: impl Into<String>,
        method: impl AsRef<str>,
        handler: Arc<dyn WebhookHandler>,
    ) -> Self {
        Self {
            path: path.into(),
            method: method.as_ref().to_ascii_uppercase(),
            handler,
            route_type: RouteType::default(),
            priority: 0,
            payload_matcher: None,
        }
    }

    pub fn with_type(mut self, route_type: RouteType) -> Self {
        self.route_type = route_type;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_payload_matcher<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.payload_matcher = Some(Arc::new(matcher));
        self
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("handler", &self.handler.handler_name())
            .field("route_type", &self.route_type)
            .field("priority", &self.priority)
            .field("payload_matcher", &self.payload_matcher.is_some())
            .finish()
    }
}

/// Result of resolving a request against the route table
#[derive(Clone)]
pub struct RouteMatch {
    pub handler: Arc<dyn WebhookHandler>,
    pub route_type: RouteType,
    pub priority: i32,
    pub match_score: u32,
    /// Pattern of the route that matched, e.g. `/wh/:id`
    pub path_pattern: String,
    pub method: String,
}

impl RouteMatch {
    pub(crate) fn from_route(route: &Route, match_score: u32) -> Self {
        Self {
            handler: Arc::clone(&route.handler),
            route_type: route.route_type,
            priority: route.priority,
            match_score,
            path_pattern: route.path.clone(),
            method: route.method.clone(),
        }
    }
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("handler", &self.handler.handler_name())
            .field("route_type", &self.route_type)
            .field("priority", &self.priority)
            .field("match_score", &self.match_score)
            .field("path_pattern", &self.path_pattern)
            .field("method", &self.method)
            .finish()
    }
}
