//! # Dispatch Configuration
//!
//! Layered configuration for the dispatch core. Values are resolved in order:
//!
//! 1. Built-in defaults (every section is `#[serde(default)]`)
//! 2. `config/dispatch.{toml,yaml,json}` if present
//! 3. `config/dispatch.{environment}.{toml,yaml,json}` if present
//! 4. Environment variables prefixed `DISPATCH__`, nested with `__`
//!    (e.g. `DISPATCH__EVENT_BUS__MAX_QUEUE_SIZE=500`)
//!
//! ```rust,no_run
//! use dispatch_core::config::DispatchConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DispatchConfig::from_env()?;
//! println!("queue capacity: {}", config.event_bus.max_queue_size);
//! # Ok(())
//! # }
//! ```

use crate::dispatcher::VerificationConfig;
use crate::error::{DispatchError, Result};
use crate::events::EventBusConfig;
use crate::execution::LoadBalancerConfig;
use crate::logging::LoggingConfig;
use crate::resilience::CircuitBreakerConfig;
use crate::routing::RouterConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const ENV_PREFIX: &str = "DISPATCH";
const DEFAULT_CONFIG_DIR: &str = "config";
const BASE_FILE_NAME: &str = "dispatch";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Deployment environment the configuration was resolved for
    pub environment: String,
    pub router: RouterConfig,
    pub circuit_breakers: CircuitBreakerSettings,
    pub load_balancer: LoadBalancerConfig,
    pub event_bus: EventBusConfig,
    pub verification: VerificationConfig,
    pub logging: LoggingConfig,
}

/// Circuit breaker defaults plus per-component overrides
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub default_config: CircuitBreakerConfig,
    pub component_configs: HashMap<String, CircuitBreakerConfig>,
}

impl CircuitBreakerSettings {
    /// Get configuration for a specific component
    pub fn config_for_component(&self, component_name: &str) -> CircuitBreakerConfig {
        self.component_configs
            .get(component_name)
            .cloned()
            .unwrap_or_else(|| self.default_config.clone())
    }
}

impl DispatchConfig {
    /// Load configuration for the environment detected from `DISPATCH_ENV` / `APP_ENV`
    pub fn from_env() -> Result<Self> {
        let environment = detect_environment();
        Self::load_from_directory_with_env(None, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Useful for tests that must not touch process-wide environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<&Path>,
        environment: &str,
    ) -> Result<Self> {
        let config_dir = config_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR));

        debug!(
            environment = %environment,
            config_dir = %config_dir.display(),
            "Loading dispatch configuration"
        );

        let base = config_dir.join(BASE_FILE_NAME);
        let env_specific = config_dir.join(format!("{BASE_FILE_NAME}.{environment}"));

        let settings = Config::builder()
            .add_source(File::with_name(&base.to_string_lossy()).required(false))
            .add_source(File::with_name(&env_specific.to_string_lossy()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override("environment", environment)
            .map_err(config_error)?
            .build()
            .map_err(config_error)?;

        let config: DispatchConfig = settings.try_deserialize().map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section, returning the first problem found
    pub fn validate(&self) -> Result<()> {
        self.circuit_breakers
            .default_config
            .validate()
            .map_err(DispatchError::Configuration)?;

        for (component, breaker) in &self.circuit_breakers.component_configs {
            breaker
                .validate()
                .map_err(|e| DispatchError::Configuration(format!("{component}: {e}")))?;
        }

        self.event_bus
            .validate()
            .map_err(DispatchError::Configuration)?;

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn config_error(e: config::ConfigError) -> DispatchError {
    DispatchError::Configuration(e.to_string())
}

/// Get current environment from environment variables
pub fn detect_environment() -> String {
    std::env::var("DISPATCH_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}
