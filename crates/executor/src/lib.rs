//! Tool execution over subprocess RPC peers.
//!
//! Each resolved service runs as a child process speaking newline-delimited
//! JSON over stdio. Connections are supervised through an explicit state
//! machine; calls are bounded by per-call deadlines, a bounded retry
//! policy, and a global concurrency ceiling shared by all services.

pub mod connection;
pub mod executor;
pub mod rpc;

pub use connection::{ConnectionState, ServiceConnection};
pub use executor::{ExecutorStats, ToolExecutor};
