//! Logging setup.
//!
//! The dispatcher emits its diagnostics through `tracing`:
//! - `info`: broadcast trace, only while the global trace flag is on
//! - `warn`: unreceived events, once-timeouts, failed deferred triggers
//! - `debug`: subscription lifecycle
//!
//! Hosts with their own subscriber can skip [`init_logging`] entirely.

use crate::config::LogConfig;
use crate::error::LoggingError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global fmt subscriber configured by `config`.
///
/// `RUST_LOG` takes precedence over `config.log_level`. Fails with
/// [`LoggingError::AlreadyInitialized`] if a global subscriber exists.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let env_filter = build_filter(config)?;

    let result = if config.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };

    result.map_err(|_| LoggingError::AlreadyInitialized)
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| LoggingError::InvalidFilter(e.to_string()))
}
