//! The instrumentation sink consumed by the pipeline.
//!
//! The pipeline only ever emits through this trait; it never reads values
//! back. Implementations decide where spans and metrics go.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Key-value attributes attached to spans and metric points.
pub type Tags = HashMap<String, String>;

/// Builds a [`Tags`] map from string pairs.
#[must_use]
pub fn tags<const N: usize>(pairs: [(&str, String); N]) -> Tags {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Sink for spans, counters, histograms and gauge deltas.
///
/// Methods are infallible from the caller's point of view. Implementations
/// must swallow their own failures; observability never blocks cooking.
pub trait Instrumentation: Send + Sync {
    /// Emits a span start event.
    fn span_start(&self, name: &str, attributes: &Tags);

    /// Emits a span end event.
    fn span_end(&self, name: &str, duration_ms: f64, attributes: &Tags);

    /// Adds one to a counter.
    fn increment_counter(&self, name: &str, tags: &Tags);

    /// Records a histogram sample.
    fn record_histogram(&self, name: &str, value: f64, tags: &Tags);

    /// Applies a delta to a gauge.
    fn adjust_gauge(&self, name: &str, delta: i64);
}

/// No-op instrumentation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpInstrumentation;

impl Instrumentation for NoOpInstrumentation {
    fn span_start(&self, _name: &str, _attributes: &Tags) {}
    fn span_end(&self, _name: &str, _duration_ms: f64, _attributes: &Tags) {}
    fn increment_counter(&self, _name: &str, _tags: &Tags) {}
    fn record_histogram(&self, _name: &str, _value: f64, _tags: &Tags) {}
    fn adjust_gauge(&self, _name: &str, _delta: i64) {}
}

/// Renders every signal as a debug-level tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInstrumentation;

impl Instrumentation for LoggingInstrumentation {
    fn span_start(&self, name: &str, attributes: &Tags) {
        tracing::debug!(span_name = name, ?attributes, "Span started");
    }

    fn span_end(&self, name: &str, duration_ms: f64, attributes: &Tags) {
        tracing::debug!(span_name = name, duration_ms, ?attributes, "Span ended");
    }

    fn increment_counter(&self, name: &str, tags: &Tags) {
        tracing::debug!(metric = name, ?tags, "Counter incremented");
    }

    fn record_histogram(&self, name: &str, value: f64, tags: &Tags) {
        tracing::debug!(metric = name, value, ?tags, "Histogram recorded");
    }

    fn adjust_gauge(&self, name: &str, delta: i64) {
        tracing::debug!(metric = name, delta, "Gauge adjusted");
    }
}

/// Forwards every signal to each inner sink in order.
#[derive(Clone, Default)]
pub struct CompositeInstrumentation {
    sinks: Vec<Arc<dyn Instrumentation>>,
}

impl CompositeInstrumentation {
    /// Creates an empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn Instrumentation>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Returns the number of inner sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if there are no inner sinks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl std::fmt::Debug for CompositeInstrumentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeInstrumentation")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl CompositeInstrumentation {
    /// Calls every sink, containing a panic in one so the rest still see the event.
    fn fan_out<F>(&self, operation: &str, call: F)
    where
        F: Fn(&dyn Instrumentation),
    {
        for sink in &self.sinks {
            let sink = sink.as_ref();
            if let Err(e) = catch_unwind(AssertUnwindSafe(|| call(sink))) {
                warn!(operation, "Composite sink member panicked: {:?}", e);
            }
        }
    }
}

impl Instrumentation for CompositeInstrumentation {
    fn span_start(&self, name: &str, attributes: &Tags) {
        self.fan_out("span_start", |sink| sink.span_start(name, attributes));
    }

    fn span_end(&self, name: &str, duration_ms: f64, attributes: &Tags) {
        self.fan_out("span_end", |sink| sink.span_end(name, duration_ms, attributes));
    }

    fn increment_counter(&self, name: &str, tags: &Tags) {
        self.fan_out("increment_counter", |sink| sink.increment_counter(name, tags));
    }

    fn record_histogram(&self, name: &str, value: f64, tags: &Tags) {
        self.fan_out("record_histogram", |sink| sink.record_histogram(name, value, tags));
    }

    fn adjust_gauge(&self, name: &str, delta: i64) {
        self.fan_out("adjust_gauge", |sink| sink.adjust_gauge(name, delta));
    }
}
