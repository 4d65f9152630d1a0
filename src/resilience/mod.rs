//! # Resilience Module
//!
//! Failure isolation for downstream webhook handlers.
//!
//! - **Circuit Breakers**: stop calling a failing handler for a cooldown period
//! - **Manager**: one named breaker per protected call-site, with per-component overrides
//! - **Protected handlers**: wrap any [`WebhookHandler`](crate::dispatcher::WebhookHandler)
//!   in a breaker so it can be registered as a route target
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dispatch_core::resilience::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CircuitBreakerConfig {
//!     failure_threshold: 5,
//!     open_timeout_ms: 30_000,
//!     half_open_probe_limit: 1,
//! };
//!
//! let circuit_breaker = CircuitBreaker::new("crm_sync", config);
//!
//! let result = circuit_breaker
//!     .execute(|| async { Ok::<&str, std::io::Error>("delivered") })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod manager;
pub mod metrics;
pub mod protected;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitBreakerState, CircuitState};
pub use config::CircuitBreakerConfig;
pub use manager::CircuitBreakerManager;
pub use metrics::{CircuitBreakerMetrics, SystemCircuitBreakerMetrics};
pub use protected::ProtectedHandler;
