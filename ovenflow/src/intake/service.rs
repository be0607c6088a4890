//! Order intake: the trigger boundary in front of the pipeline.

use super::OrderRequest;
use crate::cancellation::CancellationToken;
use crate::core::Item;
use crate::errors::CancellationFailure;
use crate::observability::{names, tags, Instrumentation, Instruments};
use crate::pipeline::PipelineOrchestrator;
use std::sync::Arc;
use tracing::info;

/// Accepts orders and hands them to the orchestrator.
#[derive(Debug, Clone)]
pub struct OrderIntake {
    orchestrator: Arc<PipelineOrchestrator>,
    instruments: Instruments,
}

impl OrderIntake {
    /// Creates an intake without its own instrumentation.
    #[must_use]
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self {
            orchestrator,
            instruments: Instruments::noop(),
        }
    }

    /// Sets the sink the `product.type` counter is emitted to.
    #[must_use]
    pub fn with_instrumentation(mut self, instrumentation: Arc<dyn Instrumentation>) -> Self {
        self.instruments = Instruments::new(instrumentation);
        self
    }

    /// Returns the orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &Arc<PipelineOrchestrator> {
        &self.orchestrator
    }

    /// Places an order and waits for the finished item.
    ///
    /// Burnt bakes are retried inside the pipeline and never surface here;
    /// the only failure is cancellation.
    pub async fn place_order(
        &self,
        request: OrderRequest,
        token: &CancellationToken,
    ) -> Result<Item, CancellationFailure> {
        self.instruments.increment_counter(
            names::PRODUCT_TYPE,
            &tags([
                (names::TAG_PRODUCT_TYPE, request.product.kind.to_string()),
                (names::TAG_CLIENT_ID, request.client.id.clone()),
            ]),
        );

        let item = request.to_item();
        info!(item_id = %item.id, client_id = %item.client_id, product = %item.kind, "Order accepted");

        self.orchestrator.process(item, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BakeryConfig;
    use crate::core::{ProductKind, StageKind};
    use crate::durations::ScriptedDurationSource;
    use crate::observability::MetricsRecorder;
    use std::time::Duration;

    fn intake(metrics: &Arc<MetricsRecorder>) -> OrderIntake {
        let orchestrator = PipelineOrchestrator::builder(BakeryConfig::default())
            .durations(Arc::new(ScriptedDurationSource::constant(1)))
            .instrumentation(metrics.clone())
            .build()
            .unwrap();
        OrderIntake::new(Arc::new(orchestrator)).with_instrumentation(metrics.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn test_place_order_counts_product_type() {
        let metrics = Arc::new(MetricsRecorder::new());
        let intake = intake(&metrics);

        let item = intake
            .place_order(OrderRequest::new("client-7", ProductKind::Calzone), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(item.kind, ProductKind::Calzone);
        assert_eq!(item.client_id, "client-7");
        assert_eq!(
            metrics.counter_tagged(
                names::PRODUCT_TYPE,
                &tags([
                    (names::TAG_PRODUCT_TYPE, "calzone".to_string()),
                    (names::TAG_CLIENT_ID, "client-7".to_string()),
                ]),
            ),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_place_order_surfaces_cancellation() {
        let metrics = Arc::new(MetricsRecorder::new());
        let intake = intake(&metrics);
        let token = CancellationToken::new();
        token.cancel_after(Duration::from_millis(1500), "request aborted");

        let failure = intake
            .place_order(OrderRequest::new("client-7", ProductKind::Pizza), &token)
            .await
            .unwrap_err();

        assert_eq!(failure.stage, StageKind::Bake);
        assert_eq!(failure.reason, "request aborted");
        assert_eq!(metrics.counter(names::PRODUCT_TYPE), 1);
        assert_eq!(metrics.counter(names::ORDER_CANCELED), 1);
        assert!(intake.orchestrator().registry().is_empty());
    }
}
