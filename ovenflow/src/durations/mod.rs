//! Stage duration sources.
//!
//! Production code draws random durations; tests replace the source with a
//! scripted one so burnt and successful bakes can be forced.

mod scripted;
mod source;

#[cfg(test)]
pub use source::MockDurationSource;
pub use scripted::ScriptedDurationSource;
pub use source::{DurationSource, RandomDurationSource};
