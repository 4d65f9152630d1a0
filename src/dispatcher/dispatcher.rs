//! # Webhook Dispatcher
//!
//! Request pipeline: build context, verify, resolve route, invoke handler.
//! Every failure is converted into a [`WebhookResponse`]; `handle` never returns an error.

use super::{
    PassthroughVerifier, PayloadVerifier, VerificationConfig, WebhookContext, WebhookHandler,
    WebhookRequest, WebhookResponse,
};
use crate::config::DispatchConfig;
use crate::error::{panic_message, DispatchError};
use crate::logging::{log_dispatch_outcome, log_error};
use crate::routing::{PayloadMatcher, Route, RouteTable, RouteType};
use chrono::Utc;
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Optional attributes for [`WebhookDispatcher::register_route`]
#[derive(Clone, Default)]
pub struct RouteOptions {
    pub route_type: Option<RouteType>,
    pub priority: Option<i32>,
    pub event_matcher: Option<PayloadMatcher>,
}

impl RouteOptions {
    pub fn with_type(mut self, route_type: RouteType) -> Self {
        self.route_type = Some(route_type);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_event_matcher<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.event_matcher = Some(Arc::new(matcher));
        self
    }
}

pub struct WebhookDispatcher {
    route_table: Arc<RouteTable>,
    verifier: Arc<dyn PayloadVerifier>,
    verification: VerificationConfig,
}

impl WebhookDispatcher {
    pub fn new(
        route_table: Arc<RouteTable>,
        verifier: Arc<dyn PayloadVerifier>,
        verification: VerificationConfig,
    ) -> Self {
        Self {
            route_table,
            verifier,
            verification,
        }
    }

    /// Dispatcher with a fresh route table and the passthrough verifier
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(
            Arc::new(RouteTable::with_config(config.router.clone())),
            Arc::new(PassthroughVerifier),
            config.verification.clone(),
        )
    }

    pub fn route_table(&self) -> &Arc<RouteTable> {
        &self.route_table
    }

    pub fn register_route(
        &self,
        path: impl Into<String>,
        method: impl AsRef<str>,
        handler: Arc<dyn WebhookHandler>,
        options: RouteOptions,
    ) {
        let mut route = Route::new(path, method, handler)
            .with_type(options.route_type.unwrap_or_default())
            .with_priority(options.priority.unwrap_or(0));
        route.payload_matcher = options.event_matcher;
        self.route_table.register(route);
    }

    pub fn unregister_route(&self, path: &str, method: &str) -> usize {
        self.route_table.unregister(path, method)
    }

    /// Process one inbound webhook end to end
    pub async fn handle(&self, request: WebhookRequest) -> WebhookResponse {
        let started = Instant::now();
        let mut context = WebhookContext::from_request(&request, Utc::now());

        let response = self.dispatch(&mut context, &request).await;

        log_dispatch_outcome(
            &context.event_id,
            &context.method,
            &context.path,
            response.status_code,
            started.elapsed().as_millis() as u64,
        );
        response
    }

    async fn dispatch(
        &self,
        context: &mut WebhookContext,
        request: &WebhookRequest,
    ) -> WebhookResponse {
        let verified = match self.verifier.verify(request, &self.verification).await {
            Ok(verified) => verified,
            Err(e) => {
                warn!(
                    method = %context.method,
                    path = %context.path,
                    source_ip = %context.source_ip,
                    error = %e,
                    "Webhook verification failed"
                );
                let status = e.status_code();
                return WebhookResponse::failure(status, DispatchError::from(e).to_string());
            }
        };

        context.event_id = verified.event_id;
        context.verified_payload = verified.payload;

        let Some(route_match) = self.route_table.resolve(
            &context.path,
            &context.method,
            Some(&context.verified_payload),
        )
        else {
            let error = DispatchError::RouteNotFound {
                method: context.method.clone(),
                path: context.path.clone(),
            };
            debug!(event_id = %context.event_id, "{}", error);
            return WebhookResponse::not_found(&context.path, &context.method, error.to_string())
                .with_event_id(&context.event_id);
        };

        debug!(
            event_id = %context.event_id,
            handler = route_match.handler.handler_name(),
            route_type = %route_match.route_type,
            match_score = route_match.match_score,
            "Route resolved"
        );

        let handler = Arc::clone(&route_match.handler);
        context.route = Some(route_match);

        let outcome = AssertUnwindSafe(handler.handle(context, request))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let error = DispatchError::Handler(e.to_string());
                log_error(
                    handler.handler_name(),
                    "handle",
                    &error.to_string(),
                    Some(&format!(
                        "event_id={} path={}",
                        context.event_id, context.path
                    )),
                );
                WebhookResponse::internal_error(error.to_string(), &context.event_id)
            }
            Err(panic) => {
                let error = DispatchError::Handler(panic_message(panic.as_ref()));
                log_error(
                    handler.handler_name(),
                    "handle",
                    &error.to_string(),
                    Some(&format!("event_id={} panicked", context.event_id)),
                );
                WebhookResponse::internal_error(error.to_string(), &context.event_id)
            }
        }
    }
}
