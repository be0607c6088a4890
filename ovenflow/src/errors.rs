//! Error types for ovenflow.
//!
//! The pipeline itself only fails one way: the order was cancelled. Burnt
//! bakes are retried internally and never reach the caller. The remaining
//! variants cover the ambient plumbing (configuration and logging setup).

use crate::core::{ItemId, StageKind};
use thiserror::Error;

/// The main error type for ovenflow operations.
#[derive(Debug, Error)]
pub enum OvenflowError {
    /// An order was cancelled before it finished.
    #[error("{0}")]
    Cancelled(#[from] CancellationFailure),

    /// The configuration is invalid or could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The logging subscriber could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal failure returned when an order's cancellation token fires.
///
/// All partial state (the in-flight registry entry) has been cleaned up by
/// the time this reaches the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Order {item_id} cancelled during {stage} (attempt {attempt}): {reason}")]
pub struct CancellationFailure {
    /// The item whose processing was cancelled.
    pub item_id: ItemId,
    /// The stage that observed the cancellation.
    pub stage: StageKind,
    /// The 1-based attempt during which it happened.
    pub attempt: u32,
    /// The reason given to the cancellation token.
    pub reason: String,
}

impl CancellationFailure {
    /// Creates a new cancellation failure.
    #[must_use]
    pub fn new(item_id: ItemId, stage: StageKind, attempt: u32, reason: impl Into<String>) -> Self {
        Self {
            item_id,
            stage,
            attempt,
            reason: reason.into(),
        }
    }
}

/// Error raised when a configuration is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A duration range has no values in it.
    #[error("Empty duration range for {stage}: {min}..{max}")]
    EmptyRange {
        /// The stage whose range is empty.
        stage: StageKind,
        /// Inclusive lower bound.
        min: u64,
        /// Exclusive upper bound.
        max: u64,
    },

    /// The tick length is zero.
    #[error("Tick length must be greater than zero")]
    ZeroTick,

    /// An environment variable held an unparsable value.
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv {
        /// The variable name.
        key: String,
        /// The raw value.
        value: String,
    },
}
