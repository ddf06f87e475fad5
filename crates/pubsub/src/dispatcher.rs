//! # Dispatcher
//!
//! Routes published events to subscribers registered under `topic:verb`.
//!
//! ## Delivery
//!
//! ```text
//! publish(origin, topic, verb, data)
//!   │
//!   ├─► slot(topic, verb)   handlers in registration order
//!   │     └─ a handler returned true ─► stop, wildcard slot skipped
//!   │
//!   └─► slot(topic, "*")    wildcard-verb handlers, same rules
//! ```
//!
//! Delivery is synchronous on the publishing call stack. No lock is held
//! while a handler runs, so handlers may subscribe, unsubscribe or publish.

use crate::config::DispatcherConfig;
use crate::error::DispatchError;
use crate::event::{Event, EventSpec, UNRECEIVED_PREFIX, WILDCARD};
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::subscription::{Delivery, Handle, Listener, Slot};
use crate::trigger::{Normalized, Trigger};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Process-wide broadcast tracing switch.
///
/// Shared by every [`Dispatcher`] in the process. Starts off; flipping it
/// through any instance changes logging for all of them.
static TRACE: AtomicBool = AtomicBool::new(false);

/// Whether broadcast tracing is on.
pub fn trace_enabled() -> bool {
    TRACE.load(Ordering::Relaxed)
}

/// Turn broadcast tracing on or off for every dispatcher.
pub fn set_trace(on: bool) {
    TRACE.store(on, Ordering::Relaxed);
}

/// Result of a publish call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// At least one handler was invoked.
    pub handled: bool,
    /// A handler returned `true` and delivery stopped early.
    pub stopped: bool,
}

type Registry = HashMap<String, HashMap<String, Arc<Slot>>>;

struct Inner {
    name: String,
    /// Next subscription key. Starts at 1, never reused.
    next_key: AtomicU64,
    topics: Mutex<Registry>,
    scheduler: Arc<dyn Scheduler>,
}

/// In-process publish/subscribe hub.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Create a dispatcher deferring work onto the caller's current-thread
    /// tokio runtime.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_scheduler(name, Arc::new(TokioScheduler::new()))
    }

    /// Create a dispatcher with an explicit scheduler.
    #[must_use]
    pub fn with_scheduler(name: impl Into<String>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                next_key: AtomicU64::new(1),
                topics: Mutex::new(HashMap::new()),
                scheduler,
            }),
        }
    }

    /// Create a dispatcher from configuration.
    ///
    /// `config.trace` only ever turns the global flag on; it never clears a
    /// flag another component set.
    #[must_use]
    pub fn from_config(config: &DispatcherConfig) -> Self {
        if config.trace {
            set_trace(true);
        }
        Self::new(config.name.clone())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Global tracing flag, see [`trace_enabled`].
    #[must_use]
    pub fn trace(&self) -> bool {
        trace_enabled()
    }

    /// Set the global tracing flag. Affects every dispatcher.
    pub fn set_trace(&self, on: bool) {
        set_trace(on);
    }

    // =========================================================================
    // SUBSCRIBE
    // =========================================================================

    /// Listen to `spec` (`"topic"` or `"topic:verb"`, verb defaults to `*`).
    ///
    /// A handler returning `true` stops propagation for that publish call.
    pub fn subscribe<F>(&self, spec: &str, handler: F) -> Handle
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        let spec = EventSpec::parse(spec);
        self.register(&spec, Arc::new(move |event: &Event| Delivery::from(handler(event))))
    }

    /// Like [`subscribe`](Self::subscribe) for handlers that never stop propagation.
    pub fn subscribe_fn<F>(&self, spec: &str, handler: F) -> Handle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribe(spec, move |event| {
            handler(event);
            false
        })
    }

    /// Listen to `spec` for a single delivery.
    ///
    /// The subscription removes itself before `handler` runs. With a
    /// `timeout`, it is removed when the window elapses and a warning is
    /// logged if it never fired.
    pub fn subscribe_once<F>(
        &self,
        spec: &str,
        handler: F,
        timeout: Option<Duration>,
    ) -> Result<Handle, DispatchError>
    where
        F: FnOnce(&Event) -> bool + Send + 'static,
    {
        let spec = EventSpec::parse(spec);
        let slot = self.slot(&spec.topic, &spec.verb);
        let key = self.next_key();
        let handle = Handle::new(slot.clone(), key);
        let own = handle.downgrade();
        let pending = Mutex::new(Some(handler));

        let wrapper: Listener = Arc::new(move |event: &Event| {
            // A parallel publish may have taken it already.
            let Some(handler) = pending.lock().take() else {
                return Delivery::Skipped;
            };
            own.cancel();
            Delivery::from(handler(event))
        });
        slot.insert(key, wrapper);
        debug!(
            dispatcher = %self.inner.name,
            topic = %spec.topic,
            verb = %spec.verb,
            wildcard = spec.is_wildcard(),
            "Once subscription created"
        );

        if let Some(timeout) = timeout {
            let own = handle.downgrade();
            let name = self.inner.name.clone();
            let EventSpec { topic, verb } = spec;
            let scheduled = self.inner.scheduler.schedule(
                timeout,
                Box::new(move || {
                    if own.cancel() {
                        warn!(
                            dispatcher = %name,
                            %topic,
                            %verb,
                            ?timeout,
                            "Expected event wasn't generated within time limit"
                        );
                    }
                }),
            );
            if let Err(e) = scheduled {
                handle.cancel();
                return Err(e);
            }
        }

        Ok(handle)
    }

    /// Cancel a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, handle: &Handle) -> bool {
        handle.cancel()
    }

    /// Number of live subscriptions on the exact `topic:verb` slot.
    ///
    /// A bare topic counts the wildcard slot.
    #[must_use]
    pub fn subscriber_count(&self, spec: &str) -> usize {
        let EventSpec { topic, verb } = EventSpec::parse(spec);
        self.inner
            .topics
            .lock()
            .get(&topic)
            .and_then(|verbs| verbs.get(&verb))
            .map_or(0, |slot| slot.len())
    }

    fn register(&self, spec: &EventSpec, listener: Listener) -> Handle {
        let slot = self.slot(&spec.topic, &spec.verb);
        let key = self.next_key();
        slot.insert(key, listener);
        debug!(
            dispatcher = %self.inner.name,
            topic = %spec.topic,
            verb = %spec.verb,
            wildcard = spec.is_wildcard(),
            "New subscription created"
        );
        Handle::new(slot, key)
    }

    fn next_key(&self) -> u64 {
        self.inner.next_key.fetch_add(1, Ordering::Relaxed)
    }

    /// Slot for (topic, verb), created on first use and never pruned.
    fn slot(&self, topic: &str, verb: &str) -> Arc<Slot> {
        let mut topics = self.inner.topics.lock();
        topics
            .entry(topic.to_string())
            .or_default()
            .entry(verb.to_string())
            .or_default()
            .clone()
    }

    // =========================================================================
    // PUBLISH
    // =========================================================================

    /// Deliver an event synchronously.
    ///
    /// A leading `!` on `topic` is stripped and makes the dispatcher warn if
    /// no handler runs. `*` is rejected as topic or verb.
    pub fn publish(
        &self,
        origin: &str,
        topic: &str,
        verb: &str,
        data: impl Into<Value>,
    ) -> Result<PublishOutcome, DispatchError> {
        let (topic, log_unreceived) = match topic.strip_prefix(UNRECEIVED_PREFIX) {
            Some(stripped) => (stripped, true),
            None => (topic, false),
        };

        if topic == WILDCARD || verb == WILDCARD {
            return Err(DispatchError::InvalidWildcardPublish {
                topic: topic.to_string(),
                verb: verb.to_string(),
            });
        }

        let event = Event::new(topic, verb, origin, data.into());
        let mut outcome = PublishOutcome::default();

        let exact = self.slot(topic, verb);
        if !self.broadcast(&exact, &event, &mut outcome.handled) {
            outcome.stopped = true;
            return Ok(outcome);
        }

        let wildcard = self.slot(topic, WILDCARD);
        if !self.broadcast(&wildcard, &event, &mut outcome.handled) {
            outcome.stopped = true;
            return Ok(outcome);
        }

        if log_unreceived && !outcome.handled {
            let event_json = serde_json::to_string(&event).unwrap_or_else(|_| event.to_string());
            warn!(
                dispatcher = %self.inner.name,
                event = %event_json,
                "Event published, but no one listened"
            );
        }

        Ok(outcome)
    }

    /// Invoke the slot's handlers in order. Returns `false` once a handler
    /// asks to stop.
    ///
    /// Keys are snapshotted up front: entries removed mid-broadcast are
    /// skipped, entries added mid-broadcast wait for the next publish. A
    /// once-subscription that lost a race to a parallel publish does not
    /// count as handled.
    fn broadcast(&self, slot: &Slot, event: &Event, handled: &mut bool) -> bool {
        if trace_enabled() {
            info!("{} broadcasting {}", self.inner.name, event);
        }

        for key in slot.keys() {
            let Some(listener) = slot.get(key) else {
                continue;
            };
            match listener(event) {
                Delivery::Skipped => {}
                Delivery::Continue => *handled = true,
                Delivery::Stop => {
                    *handled = true;
                    return false;
                }
            }
        }
        true
    }

    // =========================================================================
    // TRIGGER
    // =========================================================================

    /// Publish a normalized [`Trigger`].
    pub fn trigger(
        &self,
        sender: &str,
        trigger: Trigger,
    ) -> Result<PublishOutcome, DispatchError> {
        let Normalized { topic, verb, data } = trigger.normalize()?;
        self.publish(sender, &topic, &verb, data)
    }

    /// Publish using a combined `"topic:verb"` address.
    pub fn trigger_combined(
        &self,
        sender: &str,
        spec: &str,
        data: impl Into<Value>,
    ) -> Result<PublishOutcome, DispatchError> {
        self.trigger(sender, Trigger::combined(spec, data))
    }

    /// Publish with topic and verb given separately.
    pub fn trigger_split(
        &self,
        sender: &str,
        topic: &str,
        verb: &str,
        data: impl Into<Value>,
    ) -> Result<PublishOutcome, DispatchError> {
        self.trigger(sender, Trigger::split(topic, verb, data))
    }

    /// Run [`trigger`](Self::trigger) on a later turn of the scheduler.
    ///
    /// Deferred triggers run in the order they were scheduled. Errors from
    /// the deferred publish are logged, there is no caller left to return
    /// them to.
    pub fn trigger_async(&self, sender: &str, trigger: Trigger) -> Result<(), DispatchError> {
        let this = self.clone();
        let sender = sender.to_string();
        self.inner.scheduler.schedule(
            Duration::ZERO,
            Box::new(move || {
                if let Err(e) = this.trigger(&sender, trigger) {
                    warn!(
                        dispatcher = %this.inner.name,
                        %sender,
                        error = %e,
                        "Deferred trigger failed"
                    );
                }
            }),
        )
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}
