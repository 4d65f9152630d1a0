use super::{WebhookContext, WebhookRequest, WebhookResponse};
use crate::error::BoxError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Target of a route: anything that can turn a verified webhook into a response
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn handle(
        &self,
        context: &WebhookContext,
        request: &WebhookRequest,
    ) -> Result<WebhookResponse, BoxError>;

    /// Get handler name for identification
    fn handler_name(&self) -> &str {
        "unnamed_handler"
    }
}

/// Handler backed by an async closure
pub struct FnHandler<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> WebhookHandler for FnHandler<F>
where
    F: Fn(WebhookContext, WebhookRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<WebhookResponse, BoxError>> + Send,
{
    async fn handle(
        &self,
        context: &WebhookContext,
        request: &WebhookRequest,
    ) -> Result<WebhookResponse, BoxError> {
        (self.f)(context.clone(), request.clone()).await
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

/// Wrap an async closure as a [`WebhookHandler`]
pub fn handler_fn<F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn WebhookHandler>
where
    F: Fn(WebhookContext, WebhookRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<WebhookResponse, BoxError>> + Send + 'static,
{
    Arc::new(FnHandler {
        name: name.into(),
        f,
    })
}
