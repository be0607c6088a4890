//! The staged production pipeline.
//!
//! This module provides:
//! - The [`Stage`] trait and the Prepare, Bake and Pack executors
//! - [`PipelineOrchestrator`], which sequences the stages per item and owns
//!   the burnt-retry and cancellation paths

mod integration_tests;
mod orchestrator;
mod stages;

pub use orchestrator::{PipelineOrchestrator, PipelineOrchestratorBuilder};
pub use stages::{BakeStage, Stage, StageClock, TimedStage};
