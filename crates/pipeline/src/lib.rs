//! Query pipeline for Switchboard.
//!
//! Wires the analyzers, resolver, installer, and executor into one engine
//! that turns a free-text query into a structured, renderable outcome.

pub mod engine;

pub use engine::QueryEngine;
