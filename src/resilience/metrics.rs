//! # Circuit Breaker Metrics

use crate::resilience::CircuitState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Metrics for a single circuit breaker instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Calls that reached the protected work
    pub total_calls: u64,

    pub success_count: u64,

    pub failure_count: u64,

    /// Calls rejected without running because the circuit was open
    pub rejected_count: u64,

    /// Number of transitions into the open state
    pub times_opened: u64,

    pub total_duration: Duration,

    pub current_state: CircuitState,

    /// Calculated failure rate (0.0 to 1.0)
    pub failure_rate: f64,

    /// Calculated success rate (0.0 to 1.0)
    pub success_rate: f64,

    pub average_duration: Duration,
}

impl CircuitBreakerMetrics {
    pub fn new() -> Self {
        Self {
            total_calls: 0,
            success_count: 0,
            failure_count: 0,
            rejected_count: 0,
            times_opened: 0,
            total_duration: Duration::ZERO,
            current_state: CircuitState::Closed,
            failure_rate: 0.0,
            success_rate: 0.0,
            average_duration: Duration::ZERO,
        }
    }

    /// Fill in the derived rates from the raw counters
    pub(crate) fn with_derived(mut self, state: CircuitState) -> Self {
        self.current_state = state;
        if self.total_calls > 0 {
            self.failure_rate = self.failure_count as f64 / self.total_calls as f64;
            self.success_rate = self.success_count as f64 / self.total_calls as f64;
            let calls = u32::try_from(self.total_calls).unwrap_or(u32::MAX);
            self.average_duration = self.total_duration / calls;
        }
        self
    }

    /// Check if metrics indicate healthy operation
    pub fn is_healthy(&self) -> bool {
        match self.current_state {
            CircuitState::Closed => self.failure_rate < 0.1,
            CircuitState::Open => false,
            CircuitState::HalfOpen => true,
        }
    }
}

impl Default for CircuitBreakerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate view over every breaker owned by a manager
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemCircuitBreakerMetrics {
    pub circuit_breakers: HashMap<String, CircuitBreakerMetrics>,
}

impl SystemCircuitBreakerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_circuit_breaker(&mut self, name: String, metrics: CircuitBreakerMetrics) {
        self.circuit_breakers.insert(name, metrics);
    }

    pub fn count_by_state(&self) -> HashMap<CircuitState, usize> {
        let mut counts = HashMap::new();
        for metrics in self.circuit_breakers.values() {
            *counts.entry(metrics.current_state).or_insert(0) += 1;
        }
        counts
    }

    /// Fraction of breakers that are healthy, 1.0 when there are none
    pub fn health_score(&self) -> f64 {
        if self.circuit_breakers.is_empty() {
            return 1.0;
        }
        let healthy = self
            .circuit_breakers
            .values()
            .filter(|m| m.is_healthy())
            .count();
        healthy as f64 / self.circuit_breakers.len() as f64
    }
}
