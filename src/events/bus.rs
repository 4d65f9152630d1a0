//! # Event Bus
//!
//! In-process publish/subscribe with a bounded priority queue.
//!
//! Only one drain runs at a time. The caller whose `emit` finds the bus idle becomes
//! the drainer and awaits until the queue is empty; any `emit` that lands while a
//! drain is running (including from inside a subscriber) just queues and returns.
//! The draining flag lives under the queue lock, so the "queue empty, stop draining"
//! and "queued, start draining?" decisions never interleave.

use super::{EventSubscriber, NewSystemEvent, SystemEvent};
use crate::constants::DEFAULT_EVENT_QUEUE_CAPACITY;
use crate::error::{panic_message, DispatchError};
use futures::future::join_all;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// What to do with an incoming event when the pending queue is at capacity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest pending event to make room
    #[default]
    DropOldest,
    /// Discard the incoming event
    DropNewest,
    /// Fail the emit with [`EventBusError::QueueFull`]
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    pub max_queue_size: usize,
    pub overflow_policy: OverflowPolicy,
    /// Cap on retained processed events; `None` keeps them until cleared
    pub max_processed_history: Option<usize>,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_EVENT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            max_processed_history: None,
        }
    }
}

impl EventBusConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_queue_size == 0 {
            return Err("event_bus.max_queue_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventBusError {
    #[error("Event queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },
}

impl From<EventBusError> for DispatchError {
    fn from(error: EventBusError) -> Self {
        match error {
            EventBusError::QueueFull { capacity } => DispatchError::QueueFull { capacity },
        }
    }
}

/// Counters since the bus was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBusStats {
    pub emitted: u64,
    pub processed: u64,
    pub dropped: u64,
    pub rejected: u64,
    pub subscriber_failures: u64,
}

struct Registration {
    id: u64,
    subscriber: Arc<dyn EventSubscriber>,
}

type Registry = Mutex<HashMap<String, Vec<Registration>>>;

/// Handle to one registration made with [`EventBus::on`]
#[derive(Debug)]
pub struct Subscription {
    event_type: String,
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Remove the registration. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.lock();
        let Some(entries) = registry.get_mut(&self.event_type) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|registration| registration.id != self.id);
        let removed = entries.len() < before;
        if entries.is_empty() {
            registry.remove(&self.event_type);
        }
        removed
    }
}

#[derive(Default)]
struct QueueState {
    /// Enqueue order; priority is applied when popping
    pending: VecDeque<SystemEvent>,
    processed: VecDeque<SystemEvent>,
    draining: bool,
    stats: EventBusStats,
}

/// Clears the draining flag if a drain future is dropped before finishing
struct DrainGuard<'a> {
    queue: &'a Mutex<QueueState>,
    armed: bool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.queue.lock().draining = false;
        }
    }
}

pub struct EventBus {
    config: EventBusConfig,
    queue: Mutex<QueueState>,
    subscribers: Arc<Registry>,
    next_registration_id: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

impl EventBus {
    pub fn new(config: EventBusConfig) -> Self {
        Self {
            config,
            queue: Mutex::new(QueueState::default()),
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_registration_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// Subscribe to an event type. Registering the same subscriber twice is a no-op
    /// and returns a handle to the existing registration.
    pub fn on(
        &self,
        event_type: impl Into<String>,
        subscriber: Arc<dyn EventSubscriber>,
    ) -> Subscription {
        let event_type = event_type.into();
        let mut registry = self.subscribers.lock();
        let entries = registry.entry(event_type.clone()).or_default();

        let existing = entries
            .iter()
            .find(|registration| same_subscriber(&registration.subscriber, &subscriber))
            .map(|registration| registration.id);

        let id = match existing {
            Some(id) => id,
            None => {
                let id = self.next_registration_id.fetch_add(1, Ordering::Relaxed);
                debug!(
                    event_type = %event_type,
                    subscriber = subscriber.subscriber_name(),
                    "Subscriber registered"
                );
                entries.push(Registration { id, subscriber });
                id
            }
        };

        Subscription {
            event_type,
            id,
            registry: Arc::downgrade(&self.subscribers),
        }
    }

    /// Queue an event and drain the queue if no drain is running.
    ///
    /// When this call starts the drain it resolves after the whole queue, including
    /// events emitted meanwhile, has been processed.
    pub async fn emit(&self, event: NewSystemEvent) -> Result<Uuid, EventBusError> {
        let (id, start_drain) = self.push(event, true)?;
        if start_drain {
            self.drain().await;
        }
        Ok(id)
    }

    /// Queue an event without draining; pair with [`EventBus::process_queue`]
    pub fn enqueue(&self, event: NewSystemEvent) -> Result<Uuid, EventBusError> {
        self.push(event, false).map(|(id, _)| id)
    }

    /// Drain the queue unless a drain is already running
    pub async fn process_queue(&self) {
        {
            let mut queue = self.queue.lock();
            if queue.draining || queue.pending.is_empty() {
                return;
            }
            queue.draining = true;
        }
        self.drain().await;
    }

    fn push(
        &self,
        event: NewSystemEvent,
        start_drain: bool,
    ) -> Result<(Uuid, bool), EventBusError> {
        let event = event.stamp();
        let id = event.id;
        let capacity = self.config.max_queue_size;

        let mut queue = self.queue.lock();
        let mut accepted = true;

        if queue.pending.len() >= capacity {
            match self.config.overflow_policy {
                OverflowPolicy::DropOldest => {
                    if let Some(dropped) = queue.pending.pop_front() {
                        queue.stats.dropped += 1;
                        warn!(
                            dropped_event_id = %dropped.id,
                            dropped_event_type = %dropped.event_type,
                            capacity = capacity,
                            "⚠️ Event queue full, dropped oldest pending event"
                        );
                    }
                }
                OverflowPolicy::DropNewest => {
                    accepted = false;
                    queue.stats.dropped += 1;
                    warn!(
                        event_id = %id,
                        event_type = %event.event_type,
                        capacity = capacity,
                        "⚠️ Event queue full, discarded incoming event"
                    );
                }
                OverflowPolicy::Reject => {
                    queue.stats.rejected += 1;
                    warn!(
                        event_type = %event.event_type,
                        capacity = capacity,
                        "⚠️ Event queue full, rejecting event"
                    );
                    return Err(EventBusError::QueueFull { capacity });
                }
            }
        }

        queue.stats.emitted += 1;
        if accepted {
            debug!(
                event_id = %id,
                event_type = %event.event_type,
                priority = ?event.priority,
                "📣 Event queued"
            );
            queue.pending.push_back(event);
        }

        let drain = start_drain && !queue.draining && !queue.pending.is_empty();
        if drain {
            queue.draining = true;
        }
        Ok((id, drain))
    }

    async fn drain(&self) {
        let mut guard = DrainGuard {
            queue: &self.queue,
            armed: true,
        };

        loop {
            let next = {
                let mut queue = self.queue.lock();
                let next = next_by_priority(&queue.pending).and_then(|i| queue.pending.remove(i));
                if next.is_none() {
                    queue.draining = false;
                    guard.armed = false;
                }
                next
            };

            let Some(mut event) = next else {
                break;
            };

            self.deliver(&event).await;
            event.processed = true;
            self.record_processed(event);
        }
    }

    async fn deliver(&self, event: &SystemEvent) {
        let subscribers: Vec<Arc<dyn EventSubscriber>> = self
            .subscribers
            .lock()
            .get(&event.event_type)
            .map(|entries| {
                entries
                    .iter()
                    .map(|registration| Arc::clone(&registration.subscriber))
                    .collect()
            })
            .unwrap_or_default();

        if subscribers.is_empty() {
            debug!(
                event_id = %event.id,
                event_type = %event.event_type,
                "No subscribers for event"
            );
            return;
        }

        let deliveries = subscribers.iter().map(|subscriber| async move {
            let outcome = AssertUnwindSafe(subscriber.handle_event(event))
                .catch_unwind()
                .await;
            (subscriber.subscriber_name(), outcome)
        });

        let mut failures = 0;
        for (name, outcome) in join_all(deliveries).await {
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    error!(
                        subscriber = name,
                        event_id = %event.id,
                        event_type = %event.event_type,
                        error = %e,
                        "❌ Event subscriber failed"
                    );
                }
                Err(panic) => {
                    failures += 1;
                    error!(
                        subscriber = name,
                        event_id = %event.id,
                        event_type = %event.event_type,
                        panic = %panic_message(panic.as_ref()),
                        "❌ Event subscriber panicked"
                    );
                }
            }
        }

        if failures > 0 {
            self.queue.lock().stats.subscriber_failures += failures;
        }
    }

    fn record_processed(&self, event: SystemEvent) {
        let mut queue = self.queue.lock();
        queue.stats.processed += 1;
        queue.processed.push_back(event);
        if let Some(limit) = self.config.max_processed_history {
            while queue.processed.len() > limit {
                queue.processed.pop_front();
            }
        }
    }

    /// Number of events waiting to be drained (excludes the one being delivered)
    pub fn queue_size(&self) -> usize {
        self.queue.lock().pending.len()
    }

    pub fn is_draining(&self) -> bool {
        self.queue.lock().draining
    }

    /// Processed events, oldest first
    pub fn processed_events(&self) -> Vec<SystemEvent> {
        self.queue.lock().processed.iter().cloned().collect()
    }

    /// Forget processed events; pending events are untouched. Returns how many were removed.
    pub fn clear_processed_events(&self) -> usize {
        let mut queue = self.queue.lock();
        let cleared = queue.processed.len();
        queue.processed.clear();
        cleared
    }

    /// Event types with at least one subscriber, sorted
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .subscribers
            .lock()
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(event_type, _)| event_type.clone())
            .collect();
        types.sort();
        types
    }

    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.subscribers
            .lock()
            .get(event_type)
            .map_or(0, |entries| entries.len())
    }

    pub fn stats(&self) -> EventBusStats {
        self.queue.lock().stats
    }
}

/// Index of the highest-priority pending event, earliest first among equals
fn next_by_priority(pending: &VecDeque<SystemEvent>) -> Option<usize> {
    let mut best: Option<(usize, u8)> = None;
    for (index, event) in pending.iter().enumerate() {
        let rank = event.priority.rank();
        if best.map_or(true, |(_, best_rank)| rank > best_rank) {
            best = Some((index, rank));
        }
    }
    best.map(|(index, _)| index)
}

fn same_subscriber(a: &Arc<dyn EventSubscriber>, b: &Arc<dyn EventSubscriber>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}
