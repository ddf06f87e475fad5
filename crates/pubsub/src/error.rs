//! Error types for the dispatcher.

use thiserror::Error;

/// Errors raised synchronously by dispatcher operations.
///
/// Diagnostics (unreceived events, once-timeouts) are never errors; they are
/// logged and the operation completes normally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// `*` is only valid when subscribing.
    #[error("You can't publish with a wildcard: {topic}:{verb}")]
    InvalidWildcardPublish { topic: String, verb: String },

    /// A combined `topic:verb` form was given together with an explicit verb.
    #[error("Unexpected parameter: {spec} already names a verb")]
    AmbiguousTriggerArguments { spec: String },

    /// Deferred work could not be scheduled.
    #[error("Scheduler unavailable: {0}")]
    SchedulerUnavailable(String),
}

/// Errors from logging initialization.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Global subscriber already initialized")]
    AlreadyInitialized,
}
