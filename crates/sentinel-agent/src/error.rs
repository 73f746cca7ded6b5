//! Error types for agent operations

use sentinel_proto::ProtocolError;
use thiserror::Error;

/// Errors raised by the agent connection machinery
#[derive(Debug, Error)]
pub enum AgentError {
    /// Wire protocol failure
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
