//! # Circuit Breaker Manager
//!
//! Owns one named circuit breaker per protected call-site. Breakers are created
//! lazily from the default configuration or a per-component override.

use crate::config::CircuitBreakerSettings;
use crate::resilience::{CircuitBreaker, CircuitBreakerMetrics, SystemCircuitBreakerMetrics};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct CircuitBreakerManager {
    circuit_breakers: DashMap<String, Arc<CircuitBreaker>>,
    settings: CircuitBreakerSettings,
}

impl CircuitBreakerManager {
    pub fn from_config(settings: &CircuitBreakerSettings) -> Self {
        info!(
            overrides = settings.component_configs.len(),
            "Initializing circuit breaker manager"
        );

        Self {
            circuit_breakers: DashMap::new(),
            settings: settings.clone(),
        }
    }

    /// Get or create the circuit breaker for a component
    pub fn get_circuit_breaker(&self, component_name: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.circuit_breakers.get(component_name) {
            return Arc::clone(breaker.value());
        }

        let breaker = self
            .circuit_breakers
            .entry(component_name.to_string())
            .or_insert_with(|| {
                let config = self.settings.config_for_component(component_name);
                Arc::new(CircuitBreaker::new(component_name, config))
            });

        Arc::clone(breaker.value())
    }

    pub fn list_components(&self) -> Vec<String> {
        self.circuit_breakers
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn get_component_metrics(&self, component_name: &str) -> Option<CircuitBreakerMetrics> {
        self.circuit_breakers
            .get(component_name)
            .map(|breaker| breaker.metrics())
    }

    pub fn get_system_metrics(&self) -> SystemCircuitBreakerMetrics {
        let mut system_metrics = SystemCircuitBreakerMetrics::new();
        for entry in self.circuit_breakers.iter() {
            system_metrics.add_circuit_breaker(entry.key().clone(), entry.value().metrics());
        }
        system_metrics
    }

    /// Reset every breaker to closed (administrative recovery)
    pub fn reset_all(&self) {
        warn!("🚨 Resetting all circuit breakers");
        for entry in self.circuit_breakers.iter() {
            entry.value().reset();
        }
    }

    pub fn remove_circuit_breaker(&self, component_name: &str) -> bool {
        let removed = self.circuit_breakers.remove(component_name).is_some();
        if removed {
            info!(component = component_name, "Removed circuit breaker");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{CircuitBreakerConfig, CircuitState};
    use std::collections::HashMap;

    fn settings() -> CircuitBreakerSettings {
        let mut component_configs = HashMap::new();
        component_configs.insert(
            "marketplace".to_string(),
            CircuitBreakerConfig {
                failure_threshold: 1,
                open_timeout_ms: 60_000,
                half_open_probe_limit: 1,
            },
        );
        CircuitBreakerSettings {
            default_config: CircuitBreakerConfig::default(),
            component_configs,
        }
    }

    #[tokio::test]
    async fn test_breakers_are_shared_per_component() {
        let manager = CircuitBreakerManager::from_config(&settings());

        let first = manager.get_circuit_breaker("analytics");
        let second = manager.get_circuit_breaker("analytics");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.config().failure_threshold, 5);

        let marketplace = manager.get_circuit_breaker("marketplace");
        assert_eq!(marketplace.config().failure_threshold, 1);

        let mut components = manager.list_components();
        components.sort();
        assert_eq!(components, vec!["analytics", "marketplace"]);
    }

    #[tokio::test]
    async fn test_system_metrics_and_reset_all() {
        let manager = CircuitBreakerManager::from_config(&settings());
        let marketplace = manager.get_circuit_breaker("marketplace");

        let _ = marketplace.execute(|| async { Err::<(), _>("down") }).await;
        assert_eq!(marketplace.state(), CircuitState::Open);

        let summary = manager.get_system_metrics().count_by_state();
        assert_eq!(summary.get(&CircuitState::Open), Some(&1));

        manager.reset_all();
        assert_eq!(marketplace.state(), CircuitState::Closed);
        assert!(manager.remove_circuit_breaker("marketplace"));
        assert!(manager.get_component_metrics("marketplace").is_none());
    }
}
