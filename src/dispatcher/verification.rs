//! Payload verification seam.
//!
//! Signature checking and idempotency live outside this crate; the dispatcher only
//! depends on the [`PayloadVerifier`] contract and the configuration it is handed.

use super::WebhookRequest;
use crate::constants::{headers, status};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("Missing signature header {header}")]
    MissingSignature { header: String },

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Duplicate event {event_id}")]
    DuplicateEvent { event_id: String },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl VerificationError {
    pub fn status_code(&self) -> u16 {
        match self {
            VerificationError::MissingSignature { .. } | VerificationError::InvalidSignature => {
                status::UNAUTHORIZED
            }
            VerificationError::DuplicateEvent { .. } => status::CONFLICT,
            VerificationError::InvalidPayload(_) => status::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureConfig {
    pub header_name: String,
    /// Name of the environment variable holding the shared secret
    pub secret_env_ref: String,
    #[serde(default)]
    pub signature_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyConfig {
    pub namespace: String,
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

/// Verification settings forwarded to the verifier on every request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    pub signature: Option<SignatureConfig>,
    pub idempotency: Option<IdempotencyConfig>,
    pub third_party_provider: bool,
}

/// Output of a successful verification
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPayload {
    pub payload: Value,
    pub event_id: String,
}

#[async_trait]
pub trait PayloadVerifier: Send + Sync {
    async fn verify(
        &self,
        request: &WebhookRequest,
        config: &VerificationConfig,
    ) -> Result<VerifiedPayload, VerificationError>;
}

/// Accepts every request as-is.
///
/// The event id comes from `x-event-id` or `x-webhook-id` when the sender supplies
/// one, otherwise a fresh UUID is generated.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughVerifier;

#[async_trait]
impl PayloadVerifier for PassthroughVerifier {
    async fn verify(
        &self,
        request: &WebhookRequest,
        _config: &VerificationConfig,
    ) -> Result<VerifiedPayload, VerificationError> {
        let event_id = request
            .header(headers::EVENT_ID)
            .or_else(|| request.header(headers::WEBHOOK_ID))
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(VerifiedPayload {
            payload: request.body.clone(),
            event_id,
        })
    }
}
