//! Duration source trait and the random implementation.

use crate::config::DurationRange;
use crate::core::StageKind;
use rand::Rng;

/// Supplies stage durations, in ticks.
///
/// Implementations must return a value; a source that cannot produce one is
/// a programming error, not a recoverable condition.
#[cfg_attr(test, mockall::automock)]
pub trait DurationSource: Send + Sync {
    /// Draws the duration for one execution of `stage` from `range`.
    fn draw(&self, stage: StageKind, range: DurationRange) -> u64;
}

/// Draws uniformly from the half-open range.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDurationSource;

impl RandomDurationSource {
    /// Creates a new random source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DurationSource for RandomDurationSource {
    fn draw(&self, _stage: StageKind, range: DurationRange) -> u64 {
        if range.is_empty() {
            return range.min;
        }
        rand::thread_rng().gen_range(range.min..range.max)
    }
}
