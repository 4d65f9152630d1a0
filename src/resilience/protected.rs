use crate::dispatcher::{WebhookContext, WebhookHandler, WebhookRequest, WebhookResponse};
use crate::error::{BoxError, DispatchError};
use crate::resilience::{CircuitBreaker, CircuitBreakerError};
use async_trait::async_trait;
use std::sync::Arc;

/// Webhook handler that runs an inner handler behind a circuit breaker
pub struct ProtectedHandler {
    inner: Arc<dyn WebhookHandler>,
    breaker: Arc<CircuitBreaker>,
}

impl ProtectedHandler {
    pub fn new(inner: Arc<dyn WebhookHandler>, breaker: Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}

#[async_trait]
impl WebhookHandler for ProtectedHandler {
    async fn handle(
        &self,
        context: &WebhookContext,
        request: &WebhookRequest,
    ) -> Result<WebhookResponse, BoxError> {
        self.breaker
            .execute(|| self.inner.handle(context, request))
            .await
            .map_err(|e| match e {
                CircuitBreakerError::CircuitOpen { component } => {
                    Box::new(DispatchError::CircuitOpen { component }) as BoxError
                }
                CircuitBreakerError::OperationFailed(inner) => inner,
            })
    }

    fn handler_name(&self) -> &str {
        self.breaker.name()
    }
}
