//! # Events
//!
//! Defines the value delivered to subscribers and the `topic[:verb]`
//! addressing used when subscribing and triggering.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Verb that matches every verb published under a topic.
///
/// Only valid for subscriptions; publishing with it is rejected.
pub const WILDCARD: &str = "*";

/// Topic prefix that asks the dispatcher to warn when nobody handles the event.
pub const UNRECEIVED_PREFIX: char = '!';

/// Verb suffix marking an event as a request.
pub const REQUEST_SUFFIX: &str = "-request";

/// A single notification flowing through the dispatcher.
///
/// Immutable once constructed. Every matching handler of a publish call
/// receives a reference to the same instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    topic: String,
    verb: String,
    origin: String,
    data: Value,
}

impl Event {
    /// Create a new event.
    #[must_use]
    pub fn new(
        topic: impl Into<String>,
        verb: impl Into<String>,
        origin: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            topic: topic.into(),
            verb: verb.into(),
            origin: origin.into(),
            data,
        }
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Name of the component that published the event.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Event payload. `Value::Null` when published without data.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Whether the verb ends with `-request`.
    #[must_use]
    pub fn is_request(&self) -> bool {
        self.verb.ends_with(REQUEST_SUFFIX)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} From: {} Data: {}",
            self.topic, self.verb, self.origin, self.data
        )
    }
}

/// A parsed `topic[:verb]` address.
///
/// The input is split on the first `:`. A missing or empty verb becomes
/// [`WILDCARD`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventSpec {
    pub topic: String,
    pub verb: String,
}

impl EventSpec {
    /// Parse a `topic` or `topic:verb` string.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        let (topic, verb) = match spec.split_once(':') {
            Some((topic, verb)) if !verb.is_empty() => (topic, verb),
            Some((topic, _)) => (topic, WILDCARD),
            None => (spec, WILDCARD),
        };
        Self {
            topic: topic.to_string(),
            verb: verb.to_string(),
        }
    }

    /// Whether this spec matches every verb of its topic.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.verb == WILDCARD
    }
}

impl fmt::Display for EventSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.topic, self.verb)
    }
}
