#![deny(unused)]
//! HTTP entry point for Ripple.
//!
//! Exposes the analyze, infer and execute stages over axum, maps
//! pipeline errors to status codes and serves health and metrics.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::{ApiError, ErrorResponse};
pub use server::{AppState, GatewayServer};
