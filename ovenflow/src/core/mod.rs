//! Core domain model types for ovenflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - The item being produced, its identity and product kind
//! - Stage kinds and the tagged stage result

mod item;
mod stage;

pub use item::{Item, ItemId, ProductKind};
pub use stage::{StageKind, StageResult};
