use super::SystemEvent;
use crate::error::BoxError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Trait for event subscribers
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Handle an event
    async fn handle_event(&self, event: &SystemEvent) -> Result<(), BoxError>;

    /// Get subscriber name for identification
    fn subscriber_name(&self) -> &str {
        "unnamed_subscriber"
    }
}

/// Subscriber backed by an async closure
pub struct FnSubscriber<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> EventSubscriber for FnSubscriber<F>
where
    F: Fn(SystemEvent) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    async fn handle_event(&self, event: &SystemEvent) -> Result<(), BoxError> {
        (self.f)(event.clone()).await
    }

    fn subscriber_name(&self) -> &str {
        &self.name
    }
}

/// Wrap an async closure as an [`EventSubscriber`]
pub fn subscriber_fn<F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn EventSubscriber>
where
    F: Fn(SystemEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(FnSubscriber {
        name: name.into(),
        f,
    })
}
