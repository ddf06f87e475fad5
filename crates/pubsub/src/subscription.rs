//! # Subscriptions
//!
//! Slots hold the callbacks registered for one exact (topic, verb) pair;
//! handles are the capability used to cancel a single entry.

use crate::event::Event;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// What a listener did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// The listener declined the event; it does not count as handled.
    Skipped,
    Continue,
    Stop,
}

impl From<bool> for Delivery {
    fn from(stop: bool) -> Self {
        if stop {
            Self::Stop
        } else {
            Self::Continue
        }
    }
}

/// Slot entry wrapping a user handler.
pub(crate) type Listener = Arc<dyn Fn(&Event) -> Delivery + Send + Sync>;

/// Ordered callbacks registered under one (topic, verb) pair.
///
/// Keys come from a monotonic per-dispatcher counter, so key order is
/// registration order.
#[derive(Default)]
pub(crate) struct Slot {
    entries: Mutex<BTreeMap<u64, Listener>>,
}

impl Slot {
    pub(crate) fn insert(&self, key: u64, listener: Listener) {
        self.entries.lock().insert(key, listener);
    }

    pub(crate) fn remove(&self, key: u64) -> bool {
        self.entries.lock().remove(&key).is_some()
    }

    /// Keys present right now, in registration order.
    pub(crate) fn keys(&self) -> Vec<u64> {
        self.entries.lock().keys().copied().collect()
    }

    /// Listener for `key`, if it has not been removed since.
    pub(crate) fn get(&self, key: u64) -> Option<Listener> {
        self.entries.lock().get(&key).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Opaque capability for cancelling one subscription.
///
/// Obtained from [`Dispatcher::subscribe`](crate::Dispatcher::subscribe) and
/// only meaningful when passed back to
/// [`Dispatcher::unsubscribe`](crate::Dispatcher::unsubscribe).
#[derive(Clone)]
pub struct Handle {
    slot: Arc<Slot>,
    key: u64,
}

impl Handle {
    pub(crate) fn new(slot: Arc<Slot>, key: u64) -> Self {
        Self { slot, key }
    }

    /// Remove the entry. Returns `false` if it was already gone.
    pub(crate) fn cancel(&self) -> bool {
        self.slot.remove(self.key)
    }

    /// Non-owning form held by the subscription's own wrapper, so that a
    /// slot never keeps itself alive.
    pub(crate) fn downgrade(&self) -> WeakHandle {
        WeakHandle {
            slot: Arc::downgrade(&self.slot),
            key: self.key,
        }
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle").finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub(crate) struct WeakHandle {
    slot: Weak<Slot>,
    key: u64,
}

impl WeakHandle {
    /// Remove the entry if the slot still exists.
    pub(crate) fn cancel(&self) -> bool {
        self.slot
            .upgrade()
            .map(|slot| slot.remove(self.key))
            .unwrap_or(false)
    }
}
