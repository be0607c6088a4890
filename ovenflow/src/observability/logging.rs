//! Log subscriber setup.

use crate::config::{Environment, LoggingConfig};
use crate::errors::OvenflowError;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// Development gets human-readable lines at INFO, production gets JSON at
/// WARN. `RUST_LOG` overrides the default directive when set. Fails if a
/// global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), OvenflowError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.default_directive()))
        .map_err(|e| OvenflowError::Logging(e.to_string()))?;

    let installed = match config.environment {
        Environment::Development => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init(),
        Environment::Production => tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_env_filter(filter)
            .try_init(),
    };

    installed.map_err(|e| OvenflowError::Logging(e.to_string()))
}
