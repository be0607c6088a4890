//! Observability utilities.

mod guarded;
mod instrumentation;
mod logging;
mod metrics;

pub use guarded::{Instruments, SpanGuard};
pub use instrumentation::{
    tags, CompositeInstrumentation, Instrumentation, LoggingInstrumentation, NoOpInstrumentation,
    Tags,
};
pub use logging::init_logging;
pub use metrics::{
    names, CounterSnapshot, GaugeSnapshot, HistogramSeries, HistogramSnapshot, MetricsRecorder,
    MetricsSnapshot,
};
