//! Core traits for Ripple.
//!
//! Traits are organized by collaborator:
//! - `model`: generative model contracts (VisionModel, ImageEditModel)
//! - `search`: web search provider contract (SearchProvider)
//! - `session`: keyed session storage (SessionStore)

pub mod model;
pub mod search;
pub mod session;

pub use model::*;
pub use search::*;
pub use session::*;
