//! Lightweight in-process metrics.
//!
//! Directory calls, field writes and discovery polls are counted as atomics
//! and rendered in Prometheus text format on demand.

pub mod metrics;
