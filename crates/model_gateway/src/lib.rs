#![deny(unused)]
//! Model gateway for Ripple.
//!
//! This crate provides:
//! - Gemini REST client for vision text generation and image editing
//! - Client construction from configuration, with a failing stand-in
//!   when no credential is available

pub mod gemini;
pub mod providers;

pub use gemini::{GeminiClient, GeminiConfig};
pub use providers::{create_clients, ModelClients, UnconfiguredModel};
