//! Shared constants for routing, dispatch and event processing.

/// Score awarded when a route path equals the request path exactly
pub const EXACT_PATH_SCORE: u32 = 100;

/// Score awarded when a route pattern with `:param` segments matches the request path
pub const PATTERN_PATH_SCORE: u32 = 50;

/// Bonus awarded when a route's payload matcher accepts the supplied payload
pub const PAYLOAD_MATCH_SCORE: u32 = 25;

/// Prefix marking a path pattern segment as a parameter placeholder
pub const PARAM_PREFIX: char = ':';

/// Default pending event capacity of the event bus
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1000;

pub mod headers {
    pub const FORWARDED_FOR: &str = "x-forwarded-for";
    pub const REAL_IP: &str = "x-real-ip";
    pub const USER_AGENT: &str = "user-agent";
    pub const EVENT_ID: &str = "x-event-id";
    pub const WEBHOOK_ID: &str = "x-webhook-id";
}

/// Value used for context fields that could not be derived from the request
pub const UNKNOWN: &str = "unknown";

pub mod status {
    pub const OK: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;
    pub const UNAUTHORIZED: u16 = 401;
    pub const NOT_FOUND: u16 = 404;
    pub const CONFLICT: u16 = 409;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
}
