//! Panic-isolating handle around an instrumentation sink.

use super::{Instrumentation, NoOpInstrumentation, Tags};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::warn;

/// Cloneable handle the pipeline emits through.
///
/// Every call into the sink runs under `catch_unwind`; a panicking sink is
/// logged and otherwise ignored.
#[derive(Clone)]
pub struct Instruments {
    sink: Arc<dyn Instrumentation>,
}

impl Instruments {
    /// Wraps a sink.
    #[must_use]
    pub fn new(sink: Arc<dyn Instrumentation>) -> Self {
        Self { sink }
    }

    /// A handle that discards everything.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Arc::new(NoOpInstrumentation))
    }

    /// Starts a span that ends when the returned guard is dropped.
    #[must_use]
    pub fn start_span(&self, name: impl Into<String>, attributes: Tags) -> SpanGuard {
        let name = name.into();
        self.guarded("span_start", |sink| sink.span_start(&name, &attributes));
        SpanGuard {
            instruments: self.clone(),
            name,
            attributes,
            start: Instant::now(),
        }
    }

    /// Adds one to a counter.
    pub fn increment_counter(&self, name: &str, tags: &Tags) {
        self.guarded("increment_counter", |sink| sink.increment_counter(name, tags));
    }

    /// Records a histogram sample.
    pub fn record_histogram(&self, name: &str, value: f64, tags: &Tags) {
        self.guarded("record_histogram", |sink| sink.record_histogram(name, value, tags));
    }

    /// Applies a delta to a gauge.
    pub fn adjust_gauge(&self, name: &str, delta: i64) {
        self.guarded("adjust_gauge", |sink| sink.adjust_gauge(name, delta));
    }

    fn guarded<F>(&self, operation: &str, call: F)
    where
        F: FnOnce(&dyn Instrumentation),
    {
        let sink = self.sink.as_ref();
        if let Err(e) = catch_unwind(AssertUnwindSafe(|| call(sink))) {
            warn!(operation, "Instrumentation sink panicked: {:?}", e);
        }
    }
}

impl Default for Instruments {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for Instruments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instruments").finish_non_exhaustive()
    }
}

/// Scoped span handle; emits `span_end` with the elapsed time on drop.
#[derive(Debug)]
pub struct SpanGuard {
    instruments: Instruments,
    name: String,
    attributes: Tags,
    start: Instant,
}

impl SpanGuard {
    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds or replaces an attribute reported at span end.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        let duration_ms = self.elapsed_ms();
        self.instruments
            .guarded("span_end", |sink| sink.span_end(&self.name, duration_ms, &self.attributes));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InstrumentationEvent, RecordingInstrumentation};
    use pretty_assertions::assert_eq;

    struct PanickingInstrumentation;

    impl Instrumentation for PanickingInstrumentation {
        fn span_start(&self, _name: &str, _attributes: &Tags) {
            panic!("span_start");
        }
        fn span_end(&self, _name: &str, _duration_ms: f64, _attributes: &Tags) {
            panic!("span_end");
        }
        fn increment_counter(&self, _name: &str, _tags: &Tags) {
            panic!("increment_counter");
        }
        fn record_histogram(&self, _name: &str, _value: f64, _tags: &Tags) {
            panic!("record_histogram");
        }
        fn adjust_gauge(&self, _name: &str, _delta: i64) {
            panic!("adjust_gauge");
        }
    }

    #[test]
    fn test_span_guard_emits_start_and_end() {
        let recorder = Arc::new(RecordingInstrumentation::new());
        let instruments = Instruments::new(recorder.clone());

        {
            let mut span = instruments.start_span("order.process", Tags::new());
            span.set_attribute("stage.status", "success");
            assert_eq!(span.name(), "order.process");
        }

        assert_eq!(
            recorder.events(),
            vec![
                InstrumentationEvent::SpanStart("order.process".to_string()),
                InstrumentationEvent::SpanEnd("order.process".to_string()),
            ]
        );
        assert_eq!(
            recorder.span_end_attributes("order.process")[0].get("stage.status"),
            Some(&"success".to_string())
        );
    }

    #[test]
    fn test_panicking_sink_is_contained() {
        let instruments = Instruments::new(Arc::new(PanickingInstrumentation));

        let span = instruments.start_span("stage.bake", Tags::new());
        instruments.increment_counter("pizza.burnt", &Tags::new());
        instruments.record_histogram("product.cookingTime", 1.0, &Tags::new());
        instruments.adjust_gauge("product.currently.cooking", 1);
        drop(span);
        // Should not panic
    }

    #[test]
    fn test_noop_default() {
        let instruments = Instruments::default();
        instruments.increment_counter("order.canceled", &Tags::new());
    }
}
