//! Dispatcher and logging configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Name given to the process-wide default dispatcher.
pub const MAIN_DISPATCHER_NAME: &str = "Main Dispatcher";

/// Configuration for a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Name used to prefix trace logs
    pub name: String,

    /// Turn on the process-wide broadcast trace
    pub trace: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: MAIN_DISPATCHER_NAME.to_string(),
            trace: false,
        }
    }
}

impl DispatcherConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PUBSUB_DISPATCHER_NAME`: Dispatcher name (default: Main Dispatcher)
    /// - `PUBSUB_TRACE`: Enable broadcast tracing (default: false)
    pub fn from_env() -> Self {
        Self {
            name: env::var("PUBSUB_DISPATCHER_NAME")
                .unwrap_or_else(|_| MAIN_DISPATCHER_NAME.to_string()),

            trace: env::var("PUBSUB_TRACE").map(|v| parse_flag(&v)).unwrap_or(false),
        }
    }

    /// Configuration for a named dispatcher, other settings from the environment.
    pub fn named(name: &str) -> Self {
        let mut config = Self::from_env();
        config.name = name.to_string();
        config
    }
}

/// Configuration for [`init_logging`](crate::init_logging).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level filter (trace, debug, info, warn, error) or a full directive
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl LogConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PUBSUB_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `PUBSUB_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("PUBSUB_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("PUBSUB_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}
