#![deny(unused)]
//! Observability for Ripple.
//!
//! This crate provides:
//! - Log subscriber setup (plain or JSON)
//! - Prometheus metrics recorder and request helpers

pub mod metrics;
pub mod tracing_layer;

pub use metrics::{record_sessions, setup_metrics_recorder, track_request};
pub use tracing_layer::{build_filter, configure_tracing};
