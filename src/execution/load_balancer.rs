//! # Load Balancer
//!
//! Spreads calls across a pool of interchangeable webhook handlers. The balancer is
//! itself a [`WebhookHandler`], so a pool can be registered directly as a route target.

use crate::dispatcher::{WebhookContext, WebhookHandler, WebhookRequest, WebhookResponse};
use crate::error::{BoxError, DispatchError};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Load balancing strategy for handler selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancingStrategy {
    /// Rotate through the pool in insertion order
    #[default]
    RoundRobin,
    /// Uniformly random pick per call
    Random,
    /// Pick the handler with the fewest calls in flight, lowest index on ties
    LeastConnections,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadBalancerConfig {
    pub strategy: LoadBalancingStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadBalancerError {
    #[error("No handlers available")]
    NoHandlersAvailable,

    #[error("Handler index {index} out of range for pool of {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

impl From<LoadBalancerError> for DispatchError {
    fn from(error: LoadBalancerError) -> Self {
        match error {
            LoadBalancerError::NoHandlersAvailable => DispatchError::NoHandlersAvailable,
            other => DispatchError::Configuration(other.to_string()),
        }
    }
}

struct PoolEntry {
    handler: Arc<dyn WebhookHandler>,
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the selected handler's in-flight count when the call finishes
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct LoadBalancer {
    name: String,
    strategy: RwLock<LoadBalancingStrategy>,
    pool: RwLock<Vec<PoolEntry>>,
    cursor: Mutex<usize>,
}

impl LoadBalancer {
    pub fn new(name: impl Into<String>, strategy: LoadBalancingStrategy) -> Self {
        Self {
            name: name.into(),
            strategy: RwLock::new(strategy),
            pool: RwLock::new(Vec::new()),
            cursor: Mutex::new(0),
        }
    }

    pub fn from_config(name: impl Into<String>, config: &LoadBalancerConfig) -> Self {
        Self::new(name, config.strategy)
    }

    pub fn with_handlers(
        name: impl Into<String>,
        strategy: LoadBalancingStrategy,
        handlers: impl IntoIterator<Item = Arc<dyn WebhookHandler>>,
    ) -> Self {
        let balancer = Self::new(name, strategy);
        for handler in handlers {
            balancer.add_handler(handler);
        }
        balancer
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> LoadBalancingStrategy {
        *self.strategy.read()
    }

    pub fn set_strategy(&self, strategy: LoadBalancingStrategy) {
        info!(balancer = %self.name, ?strategy, "Load balancing strategy changed");
        *self.strategy.write() = strategy;
    }

    pub fn add_handler(&self, handler: Arc<dyn WebhookHandler>) {
        debug!(
            balancer = %self.name,
            handler = handler.handler_name(),
            "Handler added to pool"
        );
        self.pool.write().push(PoolEntry {
            handler,
            in_flight: Arc::new(AtomicUsize::new(0)),
        });
    }

    pub fn insert_handler(
        &self,
        index: usize,
        handler: Arc<dyn WebhookHandler>,
    ) -> Result<(), LoadBalancerError> {
        let mut pool = self.pool.write();
        if index > pool.len() {
            return Err(LoadBalancerError::IndexOutOfRange {
                index,
                len: pool.len(),
            });
        }
        pool.insert(
            index,
            PoolEntry {
                handler,
                in_flight: Arc::new(AtomicUsize::new(0)),
            },
        );
        Ok(())
    }

    pub fn remove_handler(&self, index: usize) -> Result<Arc<dyn WebhookHandler>, LoadBalancerError> {
        let mut pool = self.pool.write();
        if index >= pool.len() {
            return Err(LoadBalancerError::IndexOutOfRange {
                index,
                len: pool.len(),
            });
        }
        Ok(pool.remove(index).handler)
    }

    pub fn len(&self) -> usize {
        self.pool.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.read().is_empty()
    }

    /// Calls currently in flight per pool position
    pub fn in_flight(&self) -> Vec<usize> {
        self.pool
            .read()
            .iter()
            .map(|entry| entry.in_flight.load(Ordering::SeqCst))
            .collect()
    }

    /// Select the next handler according to the current strategy
    pub fn select_handler(&self) -> Result<Arc<dyn WebhookHandler>, LoadBalancerError> {
        self.select().map(|(handler, _)| handler)
    }

    fn select(&self) -> Result<(Arc<dyn WebhookHandler>, Arc<AtomicUsize>), LoadBalancerError> {
        let pool = self.pool.read();
        if pool.is_empty() {
            return Err(LoadBalancerError::NoHandlersAvailable);
        }

        let index = match self.strategy() {
            LoadBalancingStrategy::RoundRobin => {
                let mut cursor = self.cursor.lock();
                // Cursor may point past the end after a removal
                let index = *cursor % pool.len();
                *cursor = (index + 1) % pool.len();
                index
            }
            LoadBalancingStrategy::Random => rand::thread_rng().gen_range(0..pool.len()),
            LoadBalancingStrategy::LeastConnections => pool
                .iter()
                .enumerate()
                .min_by_key(|(_, entry)| entry.in_flight.load(Ordering::SeqCst))
                .map(|(index, _)| index)
                .unwrap_or(0),
        };

        let entry = &pool[index];
        Ok((Arc::clone(&entry.handler), Arc::clone(&entry.in_flight)))
    }

    /// Select a handler and invoke it, propagating its result or error
    pub async fn execute(
        &self,
        context: &WebhookContext,
        request: &WebhookRequest,
    ) -> Result<WebhookResponse, BoxError> {
        let (handler, in_flight) = self.select()?;
        let _guard = InFlightGuard::acquire(&in_flight);

        debug!(
            balancer = %self.name,
            handler = handler.handler_name(),
            event_id = %context.event_id,
            "Dispatching to pooled handler"
        );

        handler.handle(context, request).await
    }
}

#[async_trait]
impl WebhookHandler for LoadBalancer {
    async fn handle(
        &self,
        context: &WebhookContext,
        request: &WebhookRequest,
    ) -> Result<WebhookResponse, BoxError> {
        self.execute(context, request).await
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}
