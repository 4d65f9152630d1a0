//! # Circuit Breaker Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Number of failures before opening the circuit
    pub failure_threshold: u32,

    /// Time the circuit stays open before a probe call is admitted
    pub open_timeout_ms: u64,

    /// Number of probe calls admitted while half-open
    pub half_open_probe_limit: u32,
}

impl CircuitBreakerConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    /// Configuration for third-party webhook targets (CRMs, marketplaces)
    pub fn for_external_api() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout_ms: 45_000,
            half_open_probe_limit: 1,
        }
    }

    /// Configuration for in-process handlers that should recover quickly
    pub fn for_internal_handler() -> Self {
        Self {
            failure_threshold: 3,
            open_timeout_ms: 10_000,
            half_open_probe_limit: 2,
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be greater than 0".to_string());
        }

        if self.failure_threshold > 100 {
            return Err("failure_threshold should not exceed 100".to_string());
        }

        if self.open_timeout_ms == 0 {
            return Err("open_timeout_ms must be greater than 0".to_string());
        }

        if self.open_timeout_ms > 300_000 {
            return Err("open_timeout_ms should not exceed 300000".to_string());
        }

        if self.half_open_probe_limit == 0 {
            return Err("half_open_probe_limit must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout_ms: 30_000,
            half_open_probe_limit: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_breaker_config_validation() {
        assert!(CircuitBreakerConfig::default().validate().is_ok());

        let mut invalid = CircuitBreakerConfig {
            failure_threshold: 0,
            ..Default::default()
        };
        assert!(invalid.validate().is_err());

        invalid = CircuitBreakerConfig {
            open_timeout_ms: 0,
            ..Default::default()
        };
        assert!(invalid.validate().is_err());

        invalid = CircuitBreakerConfig {
            half_open_probe_limit: 0,
            ..Default::default()
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_preset_configurations() {
        let api = CircuitBreakerConfig::for_external_api();
        assert_eq!(api.open_timeout(), Duration::from_secs(45));
        assert!(api.validate().is_ok());

        let internal = CircuitBreakerConfig::for_internal_handler();
        assert_eq!(internal.half_open_probe_limit, 2);
        assert!(internal.validate().is_ok());
    }
}
