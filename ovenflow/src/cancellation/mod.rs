//! Cooperative cancellation.
//!
//! A single [`CancellationToken`] is threaded through every wait point of an
//! order's pipeline, including the waits of burnt-retry attempts.

mod token;

pub use token::{CancellationToken, WaitOutcome};
