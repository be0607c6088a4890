//! In-flight bookkeeping shared by all concurrently running pipelines.

mod in_flight;

pub use in_flight::InFlightRegistry;
