#![deny(unused)]
//! Core types, traits, and error definitions for Switchboard.
//!
//! This crate provides the foundational building blocks shared across the
//! routing pipeline: the intent and tool models, the service table entries,
//! the error taxonomy, and the configuration surface.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::*;
pub use types::*;
