//! # Webhook Dispatch
//!
//! Entry point for inbound webhooks. The host HTTP layer normalizes a request into a
//! [`WebhookRequest`] and hands it to [`WebhookDispatcher::handle`], which verifies it,
//! resolves a route and invokes the route's [`WebhookHandler`].

pub mod context;
#[allow(clippy::module_inception)]
pub mod dispatcher;
pub mod handler;
pub mod verification;

pub use context::{ResponseBody, WebhookContext, WebhookRequest, WebhookResponse};
pub use dispatcher::{RouteOptions, WebhookDispatcher};
pub use handler::{handler_fn, FnHandler, WebhookHandler};
pub use verification::{
    IdempotencyConfig, PassthroughVerifier, PayloadVerifier, SignatureConfig, VerificationConfig,
    VerificationError, VerifiedPayload,
};
