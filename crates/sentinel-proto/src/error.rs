//! Error types for protocol operations

use thiserror::Error;

/// Protocol-specific errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// I/O failure on the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the connection in the middle of a frame
    #[error("connection closed mid-frame")]
    Truncated,

    /// Payload could not be deserialized
    #[error("undecodable payload: {0}")]
    Decode(String),

    /// Message could not be serialized
    #[error("serialization error: {0}")]
    Encode(String),

    /// Frame exceeds the size bound
    #[error("frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Actual frame size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },
}

impl ProtocolError {
    /// Whether the framing discipline survives this error.
    ///
    /// A `Decode` failure consumes exactly one frame; the stream is still
    /// aligned on a frame boundary and the connection may stay open.
    /// Everything else means the stream is unusable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}
