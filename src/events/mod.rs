//! # Event System
//!
//! In-process event bus used to fan out internal system events to subscribers.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dispatch_core::events::{subscriber_fn, EventBus, EventPriority, EventSource, NewSystemEvent};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = EventBus::default();
//!
//! let subscription = bus.on(
//!     "module.installed",
//!     subscriber_fn("audit", |event| async move {
//!         println!("{} from {}", event.event_type, event.source);
//!         Ok(())
//!     }),
//! );
//!
//! bus.emit(
//!     NewSystemEvent::new("module.installed", EventSource::Modules, json!({"module": "crm"}))
//!         .with_priority(EventPriority::High),
//! )
//! .await?;
//!
//! subscription.unsubscribe();
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod subscriber;
pub mod types;

pub use bus::{EventBus, EventBusConfig, EventBusError, EventBusStats, OverflowPolicy, Subscription};
pub use subscriber::{subscriber_fn, EventSubscriber, FnSubscriber};
pub use types::{EventPriority, EventSource, NewSystemEvent, SystemEvent};
