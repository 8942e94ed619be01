//! Lightweight in-process metrics.
//!
//! Metrics are stored as atomics in `DashMap`s keyed by label sets and
//! rendered by the `/metrics` handler in Prometheus text format.

pub mod metrics;

pub use metrics::GatewayMetrics;
