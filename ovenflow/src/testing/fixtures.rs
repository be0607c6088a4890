//! A fully wired bakery for tests.

use std::sync::Arc;

use super::RecordingInstrumentation;
use crate::config::BakeryConfig;
use crate::durations::ScriptedDurationSource;
use crate::errors::ConfigError;
use crate::intake::OrderIntake;
use crate::observability::{CompositeInstrumentation, MetricsRecorder};
use crate::pipeline::PipelineOrchestrator;
use crate::registry::InFlightRegistry;

/// An orchestrator wired to a scripted duration source, a recording sink and
/// an in-memory metrics recorder.
#[derive(Debug)]
pub struct TestBakery {
    /// The scripted duration source.
    pub durations: Arc<ScriptedDurationSource>,
    /// Every instrumentation call, in order.
    pub recorder: Arc<RecordingInstrumentation>,
    /// Aggregated metrics.
    pub metrics: Arc<MetricsRecorder>,
    /// The orchestrator under test.
    pub orchestrator: Arc<PipelineOrchestrator>,
}

impl TestBakery {
    /// Builds a bakery with the default configuration.
    #[must_use]
    pub fn new(durations: ScriptedDurationSource) -> Self {
        match Self::with_config(BakeryConfig::default(), durations) {
            Ok(bakery) => bakery,
            Err(e) => unreachable!("default configuration is valid: {e}"),
        }
    }

    /// Builds a bakery with a custom configuration.
    pub fn with_config(
        config: BakeryConfig,
        durations: ScriptedDurationSource,
    ) -> Result<Self, ConfigError> {
        let durations = Arc::new(durations);
        let recorder = Arc::new(RecordingInstrumentation::new());
        let metrics = Arc::new(MetricsRecorder::new());
        let sink = CompositeInstrumentation::new()
            .with(recorder.clone())
            .with(metrics.clone());

        let orchestrator = PipelineOrchestrator::builder(config)
            .durations(durations.clone())
            .instrumentation(Arc::new(sink))
            .build()?;

        Ok(Self {
            durations,
            recorder,
            metrics,
            orchestrator: Arc::new(orchestrator),
        })
    }

    /// Returns the orchestrator's registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<InFlightRegistry> {
        self.orchestrator.registry()
    }

    /// Returns an intake in front of the orchestrator, reporting to the same sinks.
    #[must_use]
    pub fn intake(&self) -> OrderIntake {
        let sink = CompositeInstrumentation::new()
            .with(self.recorder.clone())
            .with(self.metrics.clone());
        OrderIntake::new(Arc::clone(&self.orchestrator)).with_instrumentation(Arc::new(sink))
    }
}
