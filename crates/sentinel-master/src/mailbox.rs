//! Per-slot outbound mailboxes
//!
//! Each occupied slot has an unbounded FIFO channel from the dispatcher to
//! the slot's connection handler. The channel receiver doubles as the wake
//! signal inside the handler's `select!`, so queued work is observable in
//! the same wait as socket readiness.

use crate::MasterError;
use sentinel_proto::Message;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Registry of one mailbox seat per slot
pub struct MailboxRegistry {
    seats: Vec<Mutex<Option<mpsc::UnboundedSender<Message>>>>,
}

impl MailboxRegistry {
    /// Create a registry with `capacity` empty seats
    pub fn new(capacity: usize) -> Self {
        Self {
            seats: (0..capacity).map(|_| Mutex::new(None)).collect(),
        }
    }

    /// Number of seats
    pub fn capacity(&self) -> usize {
        self.seats.len()
    }

    /// Mint a fresh mailbox for `slot` and hand back its receiving end.
    ///
    /// Any stale sender left by a previous occupant is replaced, so delivery
    /// only ever reaches the handler currently holding the slot.
    pub fn register(&self, slot: usize) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(seat) = self.seats.get(slot) {
            *seat.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        }
        rx
    }

    /// Drop the sender for `slot`. Idempotent.
    pub fn deregister(&self, slot: usize) {
        if let Some(seat) = self.seats.get(slot) {
            *seat.lock().unwrap_or_else(PoisonError::into_inner) = None;
        }
    }

    /// Enqueue a message for the handler occupying `slot`
    pub fn deliver(&self, slot: usize, message: Message) -> Result<(), MasterError> {
        let seat = self.seats.get(slot).ok_or(MasterError::SlotOutOfRange {
            slot,
            capacity: self.seats.len(),
        })?;
        let guard = seat.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => tx
                .send(message)
                .map_err(|_| MasterError::MailboxClosed(slot)),
            None => Err(MasterError::EmptySlot(slot)),
        }
    }
}
