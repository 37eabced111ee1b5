//! Model provider adapter for Switchboard.
//!
//! Wraps Rig's provider clients behind the `LlmClient` trait used by the
//! intent and tool-need analyzers.

pub mod client;

pub use client::{create_default_client, NullLlm, RigConfig, RigLlmClient, RigProvider};
