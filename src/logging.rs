//! # Structured Logging Module
//!
//! Environment-aware structured logging for the dispatch core. Output is either
//! human-readable or JSON lines, filtered by `RUST_LOG` when set and otherwise by
//! a level derived from the deployment environment.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Explicit filter directive; falls back to the environment default when unset
    pub level: Option<String>,
}

/// Initialize structured logging for the given environment
pub fn init_structured_logging(environment: &str, config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let level = config
            .level
            .clone()
            .unwrap_or_else(|| get_log_level(environment).to_string());

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

        let layer = match config.format {
            LogFormat::Pretty => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed(),
        };

        // A global subscriber may already be installed by the host application
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            environment = %environment,
            level = %level,
            format = ?config.format,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for route table mutations
pub fn log_route_operation(operation: &str, method: &str, path: &str, details: Option<&str>) {
    tracing::info!(
        operation = %operation,
        method = %method,
        path = %path,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🧭 ROUTE_OPERATION"
    );
}

/// Log the outcome of a dispatched webhook
pub fn log_dispatch_outcome(
    event_id: &str,
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
) {
    tracing::info!(
        event_id = %event_id,
        method = %method,
        path = %path,
        status_code = status_code,
        duration_ms = duration_ms,
        "📨 DISPATCH"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
