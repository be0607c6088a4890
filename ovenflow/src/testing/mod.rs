//! Testing utilities for ovenflow pipelines.
//!
//! This module provides:
//! - A recording instrumentation sink
//! - A fully wired test bakery with scripted durations

mod fixtures;
mod mocks;

pub use crate::durations::ScriptedDurationSource;
pub use fixtures::TestBakery;
pub use mocks::{InstrumentationEvent, RecordingInstrumentation};
