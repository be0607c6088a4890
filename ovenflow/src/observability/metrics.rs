//! Metric names and the in-memory metrics recorder.

use super::{Instrumentation, Tags};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric, span and tag names emitted by the pipeline.
pub mod names {
    /// Counter: orders placed, tagged by product type and client.
    pub const PRODUCT_TYPE: &str = "product.type";
    /// Counter: orders cancelled.
    pub const ORDER_CANCELED: &str = "order.canceled";
    /// Counter: bakes that ran past the threshold.
    pub const PIZZA_BURNT: &str = "pizza.burnt";
    /// Gauge: items between intake and completion.
    pub const CURRENTLY_COOKING: &str = "product.currently.cooking";
    /// Histogram: total cooking time in seconds, tagged by product type.
    pub const COOKING_TIME: &str = "product.cookingTime";

    /// Span around a whole order.
    pub const ORDER_SPAN: &str = "order.process";
    /// Span around one pass through the stages; a burnt bake starts another.
    pub const ATTEMPT_SPAN: &str = "order.attempt";

    /// Tag: product type.
    pub const TAG_PRODUCT_TYPE: &str = "product.type";
    /// Tag: client id.
    pub const TAG_CLIENT_ID: &str = "client.id";
    /// Tag: item id.
    pub const TAG_ITEM_ID: &str = "item.id";
    /// Tag: attempt number.
    pub const TAG_ATTEMPT: &str = "attempt";
    /// Tag: stage outcome.
    pub const TAG_STATUS: &str = "status";
}

/// Point-in-time view of one counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Increments across all tag sets.
    pub total: u64,
    /// Increments per tag set, keyed by sorted `key=value` pairs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_tags: BTreeMap<String, u64>,
}

/// Point-in-time view of one gauge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaugeSnapshot {
    /// Current value.
    pub value: i64,
    /// Number of positive adjustments.
    pub increments: u64,
    /// Number of negative adjustments.
    pub decrements: u64,
}

/// Point-in-time view of one histogram.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    /// Number of samples.
    pub count: u64,
    /// Sum of samples.
    pub sum: f64,
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
}

impl HistogramSnapshot {
    /// Returns the mean, or zero when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // counts stay far below 2^52
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    fn record(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }
}

/// Point-in-time view of one histogram, overall and per tag set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramSeries {
    /// Summary across all tag sets.
    #[serde(flatten)]
    pub total: HistogramSnapshot,
    /// Summary per tag set, keyed by sorted `key=value` pairs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_tags: BTreeMap<String, HistogramSnapshot>,
}

/// Serializable view of every recorded metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Counters by name.
    pub counters: BTreeMap<String, CounterSnapshot>,
    /// Gauges by name.
    pub gauges: BTreeMap<String, GaugeSnapshot>,
    /// Histograms by name.
    pub histograms: BTreeMap<String, HistogramSeries>,
}

/// In-memory metrics backend.
///
/// Spans are ignored; counters, gauges and histograms are aggregated in
/// sharded maps so concurrent pipelines don't serialize on one lock.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    counters: DashMap<String, CounterSnapshot>,
    gauges: DashMap<String, GaugeSnapshot>,
    histograms: DashMap<String, HistogramSeries>,
}

impl MetricsRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a counter's total.
    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).map_or(0, |c| c.total)
    }

    /// Returns a counter's value for one exact tag set.
    #[must_use]
    pub fn counter_tagged(&self, name: &str, tags: &Tags) -> u64 {
        let key = tag_key(tags);
        self.counters
            .get(name)
            .and_then(|c| c.by_tags.get(&key).copied())
            .unwrap_or(0)
    }

    /// Returns a gauge's current value.
    #[must_use]
    pub fn gauge(&self, name: &str) -> i64 {
        self.gauges.get(name).map_or(0, |g| g.value)
    }

    /// Returns a gauge's full snapshot.
    #[must_use]
    pub fn gauge_snapshot(&self, name: &str) -> GaugeSnapshot {
        self.gauges.get(name).map(|g| g.value().clone()).unwrap_or_default()
    }

    /// Returns a histogram's snapshot, if any sample was recorded.
    #[must_use]
    pub fn histogram(&self, name: &str) -> Option<HistogramSnapshot> {
        self.histograms.get(name).map(|h| h.total.clone())
    }

    /// Returns a histogram's snapshot for one exact tag set.
    #[must_use]
    pub fn histogram_tagged(&self, name: &str, tags: &Tags) -> Option<HistogramSnapshot> {
        let key = tag_key(tags);
        self.histograms
            .get(name)
            .and_then(|h| h.by_tags.get(&key).cloned())
    }

    /// Copies every metric into a serializable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self
                .counters
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            gauges: self
                .gauges
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            histograms: self
                .histograms
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
        }
    }

    /// Clears everything.
    pub fn reset(&self) {
        self.counters.clear();
        self.gauges.clear();
        self.histograms.clear();
    }
}

impl Instrumentation for MetricsRecorder {
    fn span_start(&self, _name: &str, _attributes: &Tags) {}

    fn span_end(&self, _name: &str, _duration_ms: f64, _attributes: &Tags) {}

    fn increment_counter(&self, name: &str, tags: &Tags) {
        let mut counter = self.counters.entry(name.to_string()).or_default();
        counter.total += 1;
        if !tags.is_empty() {
            *counter.by_tags.entry(tag_key(tags)).or_insert(0) += 1;
        }
    }

    fn record_histogram(&self, name: &str, value: f64, tags: &Tags) {
        let mut series = self.histograms.entry(name.to_string()).or_default();
        series.total.record(value);
        if !tags.is_empty() {
            series.by_tags.entry(tag_key(tags)).or_default().record(value);
        }
    }

    fn adjust_gauge(&self, name: &str, delta: i64) {
        let mut gauge = self.gauges.entry(name.to_string()).or_default();
        gauge.value += delta;
        match delta.signum() {
            1 => gauge.increments += 1,
            -1 => gauge.decrements += 1,
            _ => {}
        }
    }
}

fn tag_key(tags: &Tags) -> String {
    let sorted: BTreeMap<&String, &String> = tags.iter().collect();
    sorted
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}
