//! # PubSub - In-Process Event Dispatcher
//!
//! A single hub through which components exchange named events without
//! holding references to one another.
//!
//! ## Addressing
//!
//! Events are addressed as `topic:verb`. Subscribing to a bare `topic` (or
//! `topic:*`) receives every verb published under that topic.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Component A  │                    │ Component B  │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Dispatcher  │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Delivery Rules
//!
//! - Exact `topic:verb` handlers run first, in registration order, then
//!   `topic:*` handlers.
//! - A handler returning `true` stops delivery for that publish call.
//! - Publishing with `*` as topic or verb is an error.
//! - Prefixing the topic with `!` logs a warning if nobody handled the event.
//!
//! ## Usage
//!
//! ```rust
//! use pubsub::{Dispatcher, ManualScheduler};
//! use std::sync::Arc;
//!
//! let bus = Dispatcher::with_scheduler("orders", Arc::new(ManualScheduler::new()));
//! let handle = bus.subscribe("order:created", |event| {
//!     println!("{event}");
//!     false
//! });
//!
//! bus.publish("svc1", "order", "created", "#1").unwrap();
//! assert!(bus.unsubscribe(&handle));
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod logging;
pub mod scheduler;
pub mod subscription;
pub mod trigger;

// Re-export main types
pub use config::{DispatcherConfig, LogConfig, MAIN_DISPATCHER_NAME};
pub use dispatcher::{set_trace, trace_enabled, Dispatcher, PublishOutcome};
pub use error::{DispatchError, LoggingError};
pub use event::{Event, EventSpec, REQUEST_SUFFIX, UNRECEIVED_PREFIX, WILDCARD};
pub use logging::init_logging;
pub use scheduler::{ManualScheduler, Scheduler, Task, TokioScheduler};
pub use subscription::Handle;
pub use trigger::Trigger;

lazy_static::lazy_static! {
    static ref MAIN_DISPATCHER: Dispatcher = Dispatcher::new(MAIN_DISPATCHER_NAME);
}

/// The process-wide default dispatcher, named `"Main Dispatcher"`.
///
/// Created on first access and never torn down. Deferred work goes to the
/// caller's current-thread tokio runtime, see [`TokioScheduler`].
pub fn main_dispatcher() -> &'static Dispatcher {
    &MAIN_DISPATCHER
}
