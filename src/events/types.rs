use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Subsystem that produced or should receive an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Orchestration,
    Modules,
    Marketplace,
    Handover,
    Analytics,
    Branding,
    Consultation,
    System,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventSource::Orchestration => "orchestration",
            EventSource::Modules => "modules",
            EventSource::Marketplace => "marketplace",
            EventSource::Handover => "handover",
            EventSource::Analytics => "analytics",
            EventSource::Branding => "branding",
            EventSource::Consultation => "consultation",
            EventSource::System => "system",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl EventPriority {
    /// Drain order rank, higher drains first
    pub fn rank(self) -> u8 {
        match self {
            EventPriority::Low => 1,
            EventPriority::Medium => 2,
            EventPriority::High => 3,
            EventPriority::Critical => 4,
        }
    }
}

/// An event as stored by the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub id: Uuid,
    pub event_type: String,
    pub source: EventSource,
    pub target: Option<EventSource>,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    pub priority: EventPriority,
    pub processed: bool,
}

/// Event as submitted by a caller; the bus assigns id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewSystemEvent {
    pub event_type: String,
    pub source: EventSource,
    pub target: Option<EventSource>,
    pub payload: Value,
    pub priority: EventPriority,
}

impl NewSystemEvent {
    pub fn new(event_type: impl Into<String>, source: EventSource, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            source,
            target: None,
            payload,
            priority: EventPriority::default(),
        }
    }

    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_target(mut self, target: EventSource) -> Self {
        self.target = Some(target);
        self
    }

    pub(crate) fn stamp(self) -> SystemEvent {
        SystemEvent {
            id: Uuid::new_v4(),
            event_type: self.event_type,
            source: self.source,
            target: self.target,
            payload: self.payload,
            timestamp: Utc::now(),
            priority: self.priority,
            processed: false,
        }
    }
}
