//! Logging and metrics helpers

pub mod logger;
pub mod metrics;

pub use self::{logger::Logger, metrics::{Metrics, MetricsSnapshot}};
