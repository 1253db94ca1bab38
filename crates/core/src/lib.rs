#![deny(unused)]
//! Core types, traits, and error definitions for Ripple.
//!
//! This crate provides the building blocks shared by every stage of the
//! click-to-action pipeline: the data model, the collaborator contracts,
//! the defensive response decoder and the image codec.

pub mod codec;
pub mod config;
pub mod decoder;
pub mod error;
pub mod mocks;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::*;
pub use types::*;
