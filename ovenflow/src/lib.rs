//! # Ovenflow
//!
//! A staged food-production pipeline.
//!
//! Every order becomes an [`Item`](core::Item) that travels through three timed
//! stages, Prepare, Bake and Pack, under a cooperative cancellation token:
//!
//! - **Sequential stages**: each item runs its own strictly ordered chain
//! - **Burnt retry**: a bake that runs past the threshold restarts the whole chain
//! - **In-flight registry**: a concurrent map of the items currently in the oven
//! - **Cancellation**: a cancelled order stops at the next wait point and cleans up
//! - **Observability**: spans, counters, a histogram and a gauge through a pluggable sink
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ovenflow::prelude::*;
//!
//! let config = BakeryConfig::default();
//! let orchestrator = PipelineOrchestrator::builder(config)
//!     .instrumentation(Arc::new(MetricsRecorder::new()))
//!     .build()?;
//!
//! let intake = OrderIntake::new(Arc::new(orchestrator));
//! let token = CancellationToken::new();
//! let item = intake.place_order(OrderRequest::new("client-1", ProductKind::Pizza), &token).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod durations;
pub mod errors;
pub mod intake;
pub mod observability;
pub mod pipeline;
pub mod registry;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{BakeryConfig, DurationRange, Environment, LoggingConfig};
    pub use crate::core::{Item, ItemId, ProductKind, StageKind, StageResult};
    pub use crate::durations::{DurationSource, RandomDurationSource};
    pub use crate::errors::{CancellationFailure, ConfigError, OvenflowError};
    pub use crate::intake::{OrderIntake, OrderRequest};
    pub use crate::observability::{
        init_logging, CompositeInstrumentation, Instrumentation, Instruments,
        LoggingInstrumentation, MetricsRecorder, MetricsSnapshot, NoOpInstrumentation, SpanGuard,
    };
    pub use crate::pipeline::{PipelineOrchestrator, PipelineOrchestratorBuilder};
    pub use crate::registry::InFlightRegistry;
    pub use std::sync::Arc;
}
