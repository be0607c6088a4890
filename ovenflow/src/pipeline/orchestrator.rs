//! Drives an item through Prepare → Bake → Pack.

use super::stages::{item_tags, BakeStage, Stage, StageClock, TimedStage};
use crate::cancellation::CancellationToken;
use crate::config::BakeryConfig;
use crate::core::{Item, StageResult};
use crate::durations::{DurationSource, RandomDurationSource};
use crate::errors::{CancellationFailure, ConfigError};
use crate::observability::{names, tags, Instrumentation, Instruments, Tags};
use crate::registry::InFlightRegistry;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, info_span, Instrument};

/// Runs orders through the production stages.
///
/// One orchestrator serves any number of concurrent orders. The only state
/// shared between them is the in-flight registry.
#[derive(Debug)]
pub struct PipelineOrchestrator {
    stages: Vec<Arc<dyn Stage>>,
    registry: Arc<InFlightRegistry>,
    instruments: Instruments,
    config: Arc<BakeryConfig>,
}

impl PipelineOrchestrator {
    /// Creates an orchestrator with random durations and no instrumentation.
    pub fn new(config: BakeryConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder(config: BakeryConfig) -> PipelineOrchestratorBuilder {
        PipelineOrchestratorBuilder::new(config)
    }

    /// Returns the in-flight registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<InFlightRegistry> {
        &self.registry
    }

    /// Returns the number of items currently in the oven.
    #[must_use]
    pub fn currently_baking(&self) -> usize {
        self.registry.len()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BakeryConfig {
        &self.config
    }

    /// Processes one item until it is finished or cancelled.
    ///
    /// A burnt bake restarts the chain from Prepare with the same item and
    /// token. There is no attempt limit: the loop ends only on success or
    /// cancellation.
    pub async fn process(
        &self,
        item: Item,
        token: &CancellationToken,
    ) -> Result<Item, CancellationFailure> {
        let span = info_span!("order", item_id = %item.id, product = %item.kind);
        self.run(item, token).instrument(span).await
    }

    async fn run(&self, item: Item, token: &CancellationToken) -> Result<Item, CancellationFailure> {
        let started = Instant::now();
        let mut order_span = self.instruments.start_span(names::ORDER_SPAN, item_tags(&item));
        self.instruments.adjust_gauge(names::CURRENTLY_COOKING, 1);

        let mut attempt: u32 = 0;
        'attempts: loop {
            attempt += 1;
            let tracing_span = info_span!("attempt", attempt);
            let mut attempt_tags = item_tags(&item);
            attempt_tags.insert(names::TAG_ATTEMPT.to_string(), attempt.to_string());
            let mut attempt_span = self.instruments.start_span(names::ATTEMPT_SPAN, attempt_tags);
            tracing_span.in_scope(|| info!(attempt, "Start cooking"));
            let mut current = item.clone();

            for stage in &self.stages {
                let result = stage
                    .execute(current, token)
                    .instrument(tracing_span.clone())
                    .await;

                match result {
                    StageResult::Success(next) => current = next,
                    StageResult::Burnt => {
                        self.registry.remove(&item.id);
                        self.instruments.increment_counter(names::PIZZA_BURNT, &Tags::new());
                        attempt_span.set_attribute(names::TAG_STATUS, "burnt");
                        error!(attempt, stage = %stage.kind(), "Burnt product, restarting");
                        continue 'attempts;
                    }
                    StageResult::Cancelled => {
                        self.registry.remove(&item.id);
                        self.instruments.increment_counter(names::ORDER_CANCELED, &Tags::new());
                        self.instruments.adjust_gauge(names::CURRENTLY_COOKING, -1);
                        attempt_span.set_attribute(names::TAG_STATUS, "cancelled");
                        drop(attempt_span);
                        order_span.set_attribute(names::TAG_STATUS, "cancelled");
                        order_span.set_attribute(names::TAG_ATTEMPT, attempt.to_string());

                        let reason = token.reason().unwrap_or_default();
                        error!(attempt, stage = %stage.kind(), reason = %reason, "Cancel cooking");
                        return Err(CancellationFailure::new(item.id, stage.kind(), attempt, reason));
                    }
                }
            }

            attempt_span.set_attribute(names::TAG_STATUS, "success");
            drop(attempt_span);

            let elapsed = started.elapsed().as_secs_f64();
            self.instruments.record_histogram(
                names::COOKING_TIME,
                elapsed,
                &tags([(names::TAG_PRODUCT_TYPE, item.kind.to_string())]),
            );
            self.instruments.adjust_gauge(names::CURRENTLY_COOKING, -1);
            order_span.set_attribute(names::TAG_STATUS, "success");
            order_span.set_attribute(names::TAG_ATTEMPT, attempt.to_string());
            info!(attempt, elapsed_s = elapsed, "Finish cooking");

            return Ok(current);
        }
    }
}

/// Builder for [`PipelineOrchestrator`].
pub struct PipelineOrchestratorBuilder {
    config: BakeryConfig,
    durations: Option<Arc<dyn DurationSource>>,
    instrumentation: Option<Arc<dyn Instrumentation>>,
    registry: Option<Arc<InFlightRegistry>>,
}

impl PipelineOrchestratorBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(config: BakeryConfig) -> Self {
        Self {
            config,
            durations: None,
            instrumentation: None,
            registry: None,
        }
    }

    /// Sets the duration source. Defaults to [`RandomDurationSource`].
    #[must_use]
    pub fn durations(mut self, durations: Arc<dyn DurationSource>) -> Self {
        self.durations = Some(durations);
        self
    }

    /// Sets the instrumentation sink. Defaults to a no-op sink.
    #[must_use]
    pub fn instrumentation(mut self, instrumentation: Arc<dyn Instrumentation>) -> Self {
        self.instrumentation = Some(instrumentation);
        self
    }

    /// Shares an existing registry. Defaults to a fresh one.
    #[must_use]
    pub fn registry(mut self, registry: Arc<InFlightRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Validates the configuration and assembles the stages.
    pub fn build(self) -> Result<PipelineOrchestrator, ConfigError> {
        self.config.validate()?;

        let durations = self
            .durations
            .unwrap_or_else(|| Arc::new(RandomDurationSource::new()));
        let instruments = self
            .instrumentation
            .map_or_else(Instruments::noop, Instruments::new);
        let registry = self.registry.unwrap_or_default();
        let config = Arc::new(self.config);
        let clock = StageClock::new(durations, Arc::clone(&config));

        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(TimedStage::prepare(
                config.prepare,
                clock.clone(),
                instruments.clone(),
            )),
            Arc::new(BakeStage::new(
                config.bake,
                config.burnt_threshold,
                clock.clone(),
                Arc::clone(&registry),
                instruments.clone(),
            )),
            Arc::new(TimedStage::pack(config.pack, clock, instruments.clone())),
        ];

        Ok(PipelineOrchestrator {
            stages,
            registry,
            instruments,
            config,
        })
    }
}

impl std::fmt::Debug for PipelineOrchestratorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestratorBuilder")
            .field("config", &self.config)
            .field("custom_durations", &self.durations.is_some())
            .field("custom_instrumentation", &self.instrumentation.is_some())
            .finish_non_exhaustive()
    }
}
