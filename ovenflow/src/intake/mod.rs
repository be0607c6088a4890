//! Order intake.
//!
//! Turns an order request into an item, counts it, and runs it through the
//! pipeline.

mod order;
mod service;

pub use order::{ClientInfo, OrderRequest, ProductRequest};
pub use service::OrderIntake;
