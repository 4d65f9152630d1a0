#![allow(dead_code)]

pub mod strategies;

use dispatch_core::dispatcher::{handler_fn, WebhookHandler, WebhookResponse};
use dispatch_core::BoxError;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Handler that answers with its own name in `data.handler`
pub fn named_handler(name: &'static str) -> Arc<dyn WebhookHandler> {
    handler_fn(name, move |_ctx, _req| async move {
        Ok(WebhookResponse::ok(json!({ "handler": name })))
    })
}

/// Handler that always fails and counts its invocations
pub fn failing_handler(name: &'static str, calls: Arc<AtomicU32>) -> Arc<dyn WebhookHandler> {
    handler_fn(name, move |_ctx, _req| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<WebhookResponse, BoxError>(format!("{name} unavailable").into())
        }
    })
}
