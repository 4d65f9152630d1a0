use crate::constants::{headers, status, UNKNOWN};
use crate::routing::{extract_params, RouteMatch};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Normalized inbound request handed over by the host HTTP layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookRequest {
    pub method: String,
    pub path: String,
    /// Header names are stored lower-cased
    pub headers: HashMap<String, String>,
    pub body: Value,
}

impl WebhookRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>, body: Value) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        let lowered = name.to_ascii_lowercase();
        self.headers
            .get(&lowered)
            .or_else(|| {
                self.headers
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
    }

    /// Client address from `x-forwarded-for` (first hop), then `x-real-ip`
    pub fn source_ip(&self) -> String {
        self.header(headers::FORWARDED_FOR)
            .and_then(|forwarded| forwarded.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .or_else(|| self.header(headers::REAL_IP).map(str::trim))
            .unwrap_or(UNKNOWN)
            .to_string()
    }
}

/// Per-request state passed by reference to the matched handler
#[derive(Debug, Clone)]
pub struct WebhookContext {
    /// Correlation id assigned during verification
    pub event_id: String,
    pub received_at: DateTime<Utc>,
    pub processing_started_at: DateTime<Utc>,
    pub path: String,
    pub method: String,
    pub source_ip: String,
    pub user_agent: String,
    pub verified_payload: Value,
    pub route: Option<RouteMatch>,
}

impl WebhookContext {
    pub fn from_request(request: &WebhookRequest, received_at: DateTime<Utc>) -> Self {
        Self {
            event_id: String::new(),
            received_at,
            processing_started_at: Utc::now(),
            path: request.path.clone(),
            method: request.method.to_ascii_uppercase(),
            source_ip: request.source_ip(),
            user_agent: request
                .header(headers::USER_AGENT)
                .unwrap_or(UNKNOWN)
                .to_string(),
            verified_payload: Value::Null,
            route: None,
        }
    }

    /// Values of `:param` segments of the matched route
    pub fn path_params(&self) -> HashMap<String, String> {
        self.route
            .as_ref()
            .and_then(|route| extract_params(&route.path_pattern, &self.path))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Uniform result of dispatching a webhook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub status_code: u16,
    pub body: ResponseBody,
}

impl WebhookResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            status_code: status::OK,
            body: ResponseBody {
                data: Some(data),
                ..Default::default()
            },
        }
    }

    pub fn failure(status_code: u16, error: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code,
            body: ResponseBody {
                error: Some(error.into()),
                ..Default::default()
            },
        }
    }

    pub fn not_found(path: &str, method: &str, error: impl Into<String>) -> Self {
        let mut response = Self::failure(status::NOT_FOUND, error);
        response.body.path = Some(path.to_string());
        response.body.method = Some(method.to_string());
        response
    }

    pub fn internal_error(error: impl Into<String>, event_id: &str) -> Self {
        Self::failure(status::INTERNAL_SERVER_ERROR, error).with_event_id(event_id)
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.body.event_id = Some(event_id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.body.message = Some(message.into());
        self
    }
}
