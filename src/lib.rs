#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Dispatch Core
//!
//! Webhook and domain-event dispatch for the agency toolkit.
//!
//! ## Overview
//!
//! Inbound webhooks are matched to handlers by path, method and payload shape using a
//! scored ranking. Handlers can be wrapped in circuit breakers and pooled behind a load
//! balancer, both of which are handlers themselves. Internal domain events flow through
//! a bounded priority queue and are fanned out to subscribers.
//!
//! ## Module Organization
//!
//! - [`routing`] - Route table, scored matching and the resolution cache
//! - [`dispatcher`] - Request pipeline: verify, resolve, invoke, normalize
//! - [`resilience`] - Circuit breakers and breaker-protected handlers
//! - [`execution`] - Load-balanced handler pools
//! - [`events`] - Priority event bus with single-flight drain
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dispatch_core::config::DispatchConfig;
//! use dispatch_core::dispatcher::{handler_fn, RouteOptions, WebhookDispatcher, WebhookRequest, WebhookResponse};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DispatchConfig::from_env()?;
//! dispatch_core::logging::init_structured_logging(&config.environment, &config.logging);
//!
//! let dispatcher = WebhookDispatcher::from_config(&config);
//! dispatcher.register_route(
//!     "/webhooks/stripe/:account",
//!     "POST",
//!     handler_fn("stripe", |ctx, _req| async move {
//!         Ok(WebhookResponse::ok(json!({ "account": ctx.path_params().get("account") })))
//!     }),
//!     RouteOptions::default(),
//! );
//!
//! let response = dispatcher
//!     .handle(WebhookRequest::new("POST", "/webhooks/stripe/acct_1", json!({})))
//!     .await;
//! println!("status {}", response.status_code);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod execution;
pub mod logging;
pub mod resilience;
pub mod routing;

pub use config::DispatchConfig;
pub use dispatcher::{
    handler_fn, PayloadVerifier, RouteOptions, WebhookContext, WebhookDispatcher, WebhookHandler,
    WebhookRequest, WebhookResponse,
};
pub use error::{BoxError, DispatchError, Result};
pub use events::{EventBus, EventPriority, EventSource, EventSubscriber, NewSystemEvent, SystemEvent};
pub use execution::{LoadBalancer, LoadBalancingStrategy};
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerManager, ProtectedHandler};
pub use routing::{Route, RouteMatch, RouteTable, RouteType};
