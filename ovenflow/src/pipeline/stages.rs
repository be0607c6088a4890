//! Stage executors.
//!
//! Stages are the units of work an item passes through. Each one draws its
//! duration, waits it out under the order's cancellation token, and reports a
//! tagged [`StageResult`].

use crate::cancellation::{CancellationToken, WaitOutcome};
use crate::config::{BakeryConfig, DurationRange};
use crate::core::{Item, ItemId, StageKind, StageResult};
use crate::durations::DurationSource;
use crate::observability::{names, tags, Instruments, Tags};
use crate::registry::InFlightRegistry;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info};

/// Trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns which stage this is.
    fn kind(&self) -> StageKind;

    /// Runs the stage for one item.
    ///
    /// Must return [`StageResult::Cancelled`] promptly once `token` fires.
    async fn execute(&self, item: Item, token: &CancellationToken) -> StageResult;
}

/// Span attributes identifying an item.
pub(crate) fn item_tags(item: &Item) -> Tags {
    tags([
        (names::TAG_ITEM_ID, item.id.to_string()),
        (names::TAG_PRODUCT_TYPE, item.kind.to_string()),
    ])
}

/// Draws stage durations and turns ticks into cancellable waits.
#[derive(Clone)]
pub struct StageClock {
    durations: Arc<dyn DurationSource>,
    config: Arc<BakeryConfig>,
}

impl StageClock {
    /// Creates a clock over a duration source, ticking at the configured rate.
    #[must_use]
    pub fn new(durations: Arc<dyn DurationSource>, config: Arc<BakeryConfig>) -> Self {
        Self { durations, config }
    }

    /// Draws the tick count for one stage execution.
    #[must_use]
    pub fn draw(&self, stage: StageKind, range: DurationRange) -> u64 {
        self.durations.draw(stage, range)
    }

    /// Waits `ticks` ticks unless the token fires first.
    pub async fn wait(&self, ticks: u64, token: &CancellationToken) -> WaitOutcome {
        token.sleep(self.config.ticks_to_duration(ticks)).await
    }
}

impl Debug for StageClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageClock")
            .field("tick_ms", &self.config.tick_ms)
            .finish_non_exhaustive()
    }
}

/// A stage that only waits: Prepare and Pack.
#[derive(Debug, Clone)]
pub struct TimedStage {
    kind: StageKind,
    range: DurationRange,
    clock: StageClock,
    instruments: Instruments,
}

impl TimedStage {
    /// Creates the Prepare stage.
    #[must_use]
    pub fn prepare(range: DurationRange, clock: StageClock, instruments: Instruments) -> Self {
        Self {
            kind: StageKind::Prepare,
            range,
            clock,
            instruments,
        }
    }

    /// Creates the Pack stage.
    #[must_use]
    pub fn pack(range: DurationRange, clock: StageClock, instruments: Instruments) -> Self {
        Self {
            kind: StageKind::Pack,
            range,
            clock,
            instruments,
        }
    }
}

#[async_trait]
impl Stage for TimedStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    async fn execute(&self, item: Item, token: &CancellationToken) -> StageResult {
        let mut span = self.instruments.start_span(self.kind.span_name(), item_tags(&item));
        let ticks = self.clock.draw(self.kind, self.range);
        info!(item_id = %item.id, stage = %self.kind, ticks, "Stage started");

        let result = match self.clock.wait(ticks, token).await {
            WaitOutcome::Elapsed => StageResult::Success(item),
            WaitOutcome::Cancelled => StageResult::Cancelled,
        };

        span.set_attribute(names::TAG_STATUS, result.label());
        result
    }
}

/// The Bake stage.
///
/// The item sits in the in-flight registry for the whole wait. A draw above
/// the burnt threshold still waits the full duration and is reported as
/// burnt afterwards.
#[derive(Debug, Clone)]
pub struct BakeStage {
    range: DurationRange,
    burnt_threshold: u64,
    clock: StageClock,
    registry: Arc<InFlightRegistry>,
    instruments: Instruments,
}

impl BakeStage {
    /// Creates the Bake stage.
    #[must_use]
    pub fn new(
        range: DurationRange,
        burnt_threshold: u64,
        clock: StageClock,
        registry: Arc<InFlightRegistry>,
        instruments: Instruments,
    ) -> Self {
        Self {
            range,
            burnt_threshold,
            clock,
            registry,
            instruments,
        }
    }
}

#[async_trait]
impl Stage for BakeStage {
    fn kind(&self) -> StageKind {
        StageKind::Bake
    }

    async fn execute(&self, item: Item, token: &CancellationToken) -> StageResult {
        let mut span = self.instruments.start_span(StageKind::Bake.span_name(), item_tags(&item));
        info!(item_id = %item.id, stage = %StageKind::Bake, "Stage started");

        let slot = OvenSlot::enter(&self.registry, &item);
        let ticks = self.clock.draw(StageKind::Bake, self.range);
        debug!(item_id = %item.id, ticks, threshold = self.burnt_threshold, "Baking");

        let result = match self.clock.wait(ticks, token).await {
            WaitOutcome::Cancelled => {
                slot.release();
                StageResult::Cancelled
            }
            WaitOutcome::Elapsed if ticks > self.burnt_threshold => {
                slot.release();
                StageResult::Burnt
            }
            WaitOutcome::Elapsed => StageResult::Success(slot.release().unwrap_or(item)),
        };

        span.set_attribute(names::TAG_STATUS, result.label());
        result
    }
}

/// Registry entry held for the duration of a bake.
///
/// Removal happens on [`OvenSlot::release`] or, if the bake future is dropped
/// mid-wait, on drop.
struct OvenSlot<'a> {
    registry: &'a InFlightRegistry,
    id: ItemId,
    released: bool,
}

impl<'a> OvenSlot<'a> {
    fn enter(registry: &'a InFlightRegistry, item: &Item) -> Self {
        registry.add(item.id, item.clone());
        Self {
            registry,
            id: item.id,
            released: false,
        }
    }

    fn release(mut self) -> Option<Item> {
        self.released = true;
        let removed = self.registry.remove(&self.id);
        debug!(item_id = %self.id, "Left the oven");
        removed
    }
}

impl Drop for OvenSlot<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.registry.remove(&self.id);
        }
    }
}
