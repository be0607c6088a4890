//! Deterministic duration source driven by per-stage scripts.

use super::DurationSource;
use crate::config::DurationRange;
use crate::core::StageKind;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Default)]
struct Script {
    queue: VecDeque<u64>,
    fallback: Option<u64>,
    draws: usize,
}

/// Replays scripted tick counts per stage.
///
/// Each stage pops from its own queue. When a queue runs dry the stage's
/// fallback is used, and without a fallback the range minimum.
///
/// ```rust,ignore
/// let source = ScriptedDurationSource::constant(1).with_script(StageKind::Bake, [8, 5]);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedDurationSource {
    scripts: Mutex<HashMap<StageKind, Script>>,
}

impl ScriptedDurationSource {
    /// Creates a source that always returns each range's minimum.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source that returns `ticks` for every stage.
    #[must_use]
    pub fn constant(ticks: u64) -> Self {
        let source = Self::new();
        for stage in StageKind::ALL {
            source.set_fallback(stage, ticks);
        }
        source
    }

    /// Queues values for a stage.
    #[must_use]
    pub fn with_script(self, stage: StageKind, ticks: impl IntoIterator<Item = u64>) -> Self {
        self.push(stage, ticks);
        self
    }

    /// Sets the value a stage returns once its queue is empty.
    #[must_use]
    pub fn with_fallback(self, stage: StageKind, ticks: u64) -> Self {
        self.set_fallback(stage, ticks);
        self
    }

    /// Appends values to a stage's queue.
    pub fn push(&self, stage: StageKind, ticks: impl IntoIterator<Item = u64>) {
        self.scripts.lock().entry(stage).or_default().queue.extend(ticks);
    }

    /// Sets a stage's fallback value.
    pub fn set_fallback(&self, stage: StageKind, ticks: u64) {
        self.scripts.lock().entry(stage).or_default().fallback = Some(ticks);
    }

    /// Returns how many times a stage has drawn.
    #[must_use]
    pub fn draws(&self, stage: StageKind) -> usize {
        self.scripts.lock().get(&stage).map_or(0, |script| script.draws)
    }
}

impl DurationSource for ScriptedDurationSource {
    fn draw(&self, stage: StageKind, range: DurationRange) -> u64 {
        let mut scripts = self.scripts.lock();
        let script = scripts.entry(stage).or_default();
        script.draws += 1;
        script
            .queue
            .pop_front()
            .or(script.fallback)
            .unwrap_or(range.min)
    }
}
