#![deny(unused)]
//! Session storage for Ripple.
//!
//! Sessions expire after an idle period and the store holds a bounded
//! number of them. Each one is individually lockable so that stages
//! mutating the same session serialize while different sessions proceed
//! in parallel.

pub mod memory;

pub use memory::{InMemorySessionStore, SessionLimits};
