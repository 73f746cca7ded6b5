//! # Sentinel Agent
//!
//! Connects to the master, streams periodic health telemetry, and executes
//! named, cancellable tasks on request, streaming their output back live.

#![warn(missing_docs)]

/// Agent configuration
pub mod config;

/// Task entry contract, cancellation token and output sink
pub mod task;

/// Built-in tasks
pub mod builtins;

/// Cancellable single-task runtime
pub mod runtime;

/// CPU/RAM sampling
pub mod stats;

/// Agent main loop and connection state machine
pub mod agent;

/// Error types for agent operations
pub mod error;

pub use agent::AgentLoop;
pub use config::AgentConfig;
pub use error::AgentError;
pub use runtime::TaskRuntime;
pub use task::{CancelToken, Task, TaskError, TaskRegistry, TaskSink};
