//! # Circuit Breaker Implementation
//!
//! Isolates a failing downstream handler. Three states:
//! Closed (normal operation), Open (failing fast), and Half-Open (probing recovery).
//!
//! All bookkeeping happens under a short synchronous lock that is never held
//! across the protected work, so exactly one transition is applied per call.

use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed,
    /// Failure mode - all calls fail fast without executing
    Open,
    /// Testing recovery - limited probe calls allowed through
    HalfOpen,
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, the work was not invoked
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Operation failed and was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::CircuitOpen { .. })
    }
}

/// Point-in-time view of the breaker's state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerState {
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    /// Monotonic timestamp driving the open timeout
    last_failure_instant: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
    half_open_probes: u32,
    metrics: CircuitBreakerMetrics,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging and metrics
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            open_timeout_ms = config.open_timeout_ms,
            half_open_probe_limit = config.half_open_probe_limit,
            "🛡️ Circuit breaker initialized"
        );

        Self {
            name,
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_instant: None,
                last_failure_at: None,
                half_open_probes: 0,
                metrics: CircuitBreakerMetrics::new(),
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failure_count
    }

    pub fn snapshot(&self) -> CircuitBreakerState {
        let inner = self.inner.lock();
        CircuitBreakerState {
            state: inner.state,
            failure_count: inner.failure_count,
            last_failure_at: inner.last_failure_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Execute an operation with circuit breaker protection.
    ///
    /// When the circuit is open and the timeout has not elapsed, `work` is never invoked.
    /// A call that panics or whose future is dropped before completing is recorded as a
    /// failure.
    pub async fn execute<F, Fut, T, E>(&self, work: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(admission) = self.try_acquire() else {
            return Err(CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
            });
        };

        let outcome = OutcomeGuard::new(self, admission);
        let result = work().await;
        outcome.complete(result.is_ok());

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Decide whether a call may proceed, performing the open -> half-open transition
    fn try_acquire(&self) -> Option<Admission> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Some(Admission::Closed),
            CircuitState::Open => {
                let timeout = self.config.open_timeout();
                let elapsed = inner
                    .last_failure_instant
                    .map_or(true, |at| at.elapsed() > timeout);

                if elapsed {
                    self.transition_to_half_open(&mut inner);
                    inner.half_open_probes = 1;
                    Some(Admission::Trial)
                } else {
                    inner.metrics.rejected_count += 1;
                    debug!(component = %self.name, "⛔ Call rejected, circuit open");
                    None
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_probes < self.config.half_open_probe_limit {
                    inner.half_open_probes += 1;
                    Some(Admission::Trial)
                } else {
                    inner.metrics.rejected_count += 1;
                    debug!(component = %self.name, "⛔ Call rejected, probe limit reached");
                    None
                }
            }
        }
    }

    fn record_success(&self, duration: Duration, admission: Admission) {
        let mut inner = self.inner.lock();
        inner.metrics.total_calls += 1;
        inner.metrics.success_count += 1;
        inner.metrics.total_duration += duration;

        debug!(
            component = %self.name,
            duration_ms = duration.as_millis(),
            "🟢 Operation succeeded"
        );

        match (inner.state, admission) {
            (CircuitState::HalfOpen, Admission::Trial) => self.transition_to_closed(&mut inner),
            (CircuitState::Closed, _) => inner.failure_count = 0,
            (state, _) => {
                // Only calls admitted as half-open trials decide recovery
                debug!(component = %self.name, ?state, "Stale success ignored");
            }
        }
    }

    fn record_failure(&self, duration: Duration, admission: Admission) {
        let mut inner = self.inner.lock();
        inner.metrics.total_calls += 1;
        inner.metrics.failure_count += 1;
        inner.metrics.total_duration += duration;

        if inner.state == CircuitState::HalfOpen && admission == Admission::Closed {
            debug!(component = %self.name, "Stale failure ignored while half-open");
            return;
        }

        inner.failure_count += 1;
        inner.last_failure_instant = Some(Instant::now());
        inner.last_failure_at = Some(Utc::now());

        warn!(
            component = %self.name,
            duration_ms = duration.as_millis(),
            failure_count = inner.failure_count,
            "🔴 Operation failed"
        );

        match inner.state {
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    self.transition_to_open(&mut inner);
                }
            }
            CircuitState::HalfOpen => {
                if inner.failure_count >= self.config.failure_threshold
                    || inner.half_open_probes >= self.config.half_open_probe_limit
                {
                    self.transition_to_open(&mut inner);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn transition_to_closed(&self, inner: &mut BreakerInner) {
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.half_open_probes = 0;

        info!(
            component = %self.name,
            total_calls = inner.metrics.total_calls,
            "🟢 Circuit breaker closed (recovered)"
        );
    }

    fn transition_to_open(&self, inner: &mut BreakerInner) {
        inner.state = CircuitState::Open;
        inner.half_open_probes = 0;
        inner.metrics.times_opened += 1;
        if inner.last_failure_instant.is_none() {
            inner.last_failure_instant = Some(Instant::now());
            inner.last_failure_at = Some(Utc::now());
        }

        error!(
            component = %self.name,
            failure_count = inner.failure_count,
            failure_threshold = self.config.failure_threshold,
            open_timeout_ms = self.config.open_timeout_ms,
            "🔴 Circuit breaker opened (failing fast)"
        );
    }

    fn transition_to_half_open(&self, inner: &mut BreakerInner) {
        inner.state = CircuitState::HalfOpen;
        inner.failure_count = 0;
        inner.half_open_probes = 0;

        info!(
            component = %self.name,
            half_open_probe_limit = self.config.half_open_probe_limit,
            "🟡 Circuit breaker half-open (testing recovery)"
        );
    }

    /// Force the circuit closed with a zero failure count, regardless of history
    pub fn reset(&self) {
        warn!(component = %self.name, "🚨 Circuit breaker reset");
        let mut inner = self.inner.lock();
        self.transition_to_closed(&mut inner);
        inner.last_failure_instant = None;
        inner.last_failure_at = None;
    }

    /// Force circuit to open state (for emergency situations)
    pub fn force_open(&self) {
        warn!(component = %self.name, "🚨 Circuit breaker forced open");
        let mut inner = self.inner.lock();
        inner.last_failure_instant = Some(Instant::now());
        inner.last_failure_at = Some(Utc::now());
        self.transition_to_open(&mut inner);
    }

    /// Get current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock();
        inner.metrics.clone().with_derived(inner.state)
    }

    /// Check if circuit is healthy (closed state with low failure rate)
    pub fn is_healthy(&self) -> bool {
        let metrics = self.metrics();
        if metrics.current_state != CircuitState::Closed {
            return false;
        }
        // Too few calls to judge
        if metrics.total_calls < 10 {
            return true;
        }
        metrics.is_healthy()
    }
}

/// How a call got past the breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Closed,
    /// Admitted while half-open (including the call that performed the transition)
    Trial,
}

/// Records the outcome of an admitted call exactly once.
///
/// Dropping it without `complete` (panic or cancelled future) records a failure.
struct OutcomeGuard<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    started: Instant,
    completed: bool,
}

impl<'a> OutcomeGuard<'a> {
    fn new(breaker: &'a CircuitBreaker, admission: Admission) -> Self {
        Self {
            breaker,
            admission,
            started: Instant::now(),
            completed: false,
        }
    }

    fn complete(mut self, success: bool) {
        self.completed = true;
        let duration = self.started.elapsed();
        if success {
            self.breaker.record_success(duration, self.admission);
        } else {
            self.breaker.record_failure(duration, self.admission);
        }
    }
}

impl Drop for OutcomeGuard<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        warn!(
            component = %self.breaker.name,
            admission = ?self.admission,
            "⚠️ Call abandoned before completing, recording failure"
        );
        self.breaker.record_failure(self.started.elapsed(), self.admission);
    }
}
