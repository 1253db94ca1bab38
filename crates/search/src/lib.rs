#![deny(unused)]
//! Web search enrichment for Ripple.
//!
//! Web context is optional: every failure path of [`SearchGateway`]
//! degrades to an empty result list instead of an error.

pub mod gateway;
pub mod serp;

pub use gateway::{SearchGateway, MARKETPLACE_ENGINE, MARKETPLACE_SITE};
pub use serp::SerpApiProvider;
