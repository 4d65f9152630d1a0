use crate::dispatcher::VerificationError;

/// Boxed error returned by webhook handlers and event subscribers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("No route found for {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("Verification failed: {0}")]
    Verification(#[from] VerificationError),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    #[error("No handlers available")]
    NoHandlersAvailable,

    #[error("Event queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DispatchError {
    /// HTTP-equivalent status code for surfacing this error in a response
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::RouteNotFound { .. } => 404,
            DispatchError::Verification(e) => e.status_code(),
            DispatchError::CircuitOpen { .. } | DispatchError::NoHandlersAvailable => 503,
            DispatchError::QueueFull { .. } => 429,
            DispatchError::Handler(_) | DispatchError::Configuration(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Best-effort message from a caught panic payload
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked without a message".to_string()
    }
}
