//! Recording instrumentation for tests.

use crate::observability::{Instrumentation, Tags};
use parking_lot::Mutex;

/// One signal captured by [`RecordingInstrumentation`].
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentationEvent {
    /// A span started.
    SpanStart(String),
    /// A span ended.
    SpanEnd(String),
    /// A counter was incremented.
    Counter(String),
    /// A histogram sample was recorded.
    Histogram(String, f64),
    /// A gauge was adjusted.
    Gauge(String, i64),
}

/// An instrumentation sink that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingInstrumentation {
    events: Mutex<Vec<InstrumentationEvent>>,
    span_ends: Mutex<Vec<(String, Tags)>>,
    metric_tags: Mutex<Vec<(String, Tags)>>,
}

impl RecordingInstrumentation {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<InstrumentationEvent> {
        self.events.lock().clone()
    }

    /// Returns the names of started spans, in order.
    #[must_use]
    pub fn started_spans(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                InstrumentationEvent::SpanStart(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the attributes each span with `name` ended with.
    #[must_use]
    pub fn span_end_attributes(&self, name: &str) -> Vec<Tags> {
        self.span_ends
            .lock()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, attributes)| attributes.clone())
            .collect()
    }

    /// Returns the tags passed with each counter or histogram call named `name`.
    #[must_use]
    pub fn metric_tags(&self, name: &str) -> Vec<Tags> {
        self.metric_tags
            .lock()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, tags)| tags.clone())
            .collect()
    }

    /// Returns how often a counter was incremented.
    #[must_use]
    pub fn counter_count(&self, name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, InstrumentationEvent::Counter(n) if n == name))
            .count()
    }

    /// Returns the histogram samples recorded under `name`.
    #[must_use]
    pub fn histogram_values(&self, name: &str) -> Vec<f64> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                InstrumentationEvent::Histogram(n, value) if n == name => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Returns the deltas applied to a gauge, in order.
    #[must_use]
    pub fn gauge_deltas(&self, name: &str) -> Vec<i64> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                InstrumentationEvent::Gauge(n, delta) if n == name => Some(*delta),
                _ => None,
            })
            .collect()
    }

    /// Clears all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
        self.span_ends.lock().clear();
        self.metric_tags.lock().clear();
    }
}

impl Instrumentation for RecordingInstrumentation {
    fn span_start(&self, name: &str, _attributes: &Tags) {
        self.events
            .lock()
            .push(InstrumentationEvent::SpanStart(name.to_string()));
    }

    fn span_end(&self, name: &str, _duration_ms: f64, attributes: &Tags) {
        self.events
            .lock()
            .push(InstrumentationEvent::SpanEnd(name.to_string()));
        self.span_ends
            .lock()
            .push((name.to_string(), attributes.clone()));
    }

    fn increment_counter(&self, name: &str, tags: &Tags) {
        self.events
            .lock()
            .push(InstrumentationEvent::Counter(name.to_string()));
        self.metric_tags.lock().push((name.to_string(), tags.clone()));
    }

    fn record_histogram(&self, name: &str, value: f64, tags: &Tags) {
        self.events
            .lock()
            .push(InstrumentationEvent::Histogram(name.to_string(), value));
        self.metric_tags.lock().push((name.to_string(), tags.clone()));
    }

    fn adjust_gauge(&self, name: &str, delta: i64) {
        self.events
            .lock()
            .push(InstrumentationEvent::Gauge(name.to_string(), delta));
    }
}
