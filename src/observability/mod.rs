//! Observability subsystem.
//!
//! Structured logs go through `tracing` at the call sites; this module
//! owns the metrics facade. Metric updates are cheap atomic operations
//! and must never fail a request.

pub mod metrics;
