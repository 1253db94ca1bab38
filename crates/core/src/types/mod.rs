//! Core type definitions for Ripple.
//!
//! Broken down by pipeline concern: detection output, intents,
//! action requests and outcomes, sessions and web search results.

pub mod action;
pub mod intent;
pub mod object;
pub mod search;
pub mod session;

pub use action::*;
pub use intent::*;
pub use object::*;
pub use search::*;
pub use session::*;
