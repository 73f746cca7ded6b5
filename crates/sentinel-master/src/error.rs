//! Error types for master operations

use sentinel_proto::ProtocolError;
use thiserror::Error;

/// Errors raised inside the master process
#[derive(Debug, Error)]
pub enum MasterError {
    /// Wire protocol failure
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Command addressed outside the table bounds
    #[error("slot {slot} out of range (capacity {capacity})")]
    SlotOutOfRange {
        /// Requested slot index
        slot: usize,
        /// Table capacity
        capacity: usize,
    },

    /// Command addressed to a slot with no connected agent
    #[error("no agent occupies slot {0}")]
    EmptySlot(usize),

    /// Handler for the slot went away while delivering
    #[error("mailbox for slot {0} closed")]
    MailboxClosed(usize),
}
