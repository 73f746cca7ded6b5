//! # Sentinel Protocol
//!
//! Message types and length-prefixed frame codec for the Sentinel
//! fleet-telemetry control plane.

#![warn(missing_docs)]

/// Message types and enums
pub mod message;

/// Frame codec for async streams
pub mod codec;

/// Error types for protocol operations
pub mod error;

pub use message::{Message, TaskState};
pub use codec::{FrameCodec, MAX_FRAME_SIZE};
pub use error::ProtocolError;
