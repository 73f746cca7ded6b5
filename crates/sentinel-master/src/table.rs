//! Shared agent status table
//!
//! A fixed-capacity array of slot records behind one mutex. Every accessor
//! holds the lock for exactly one record update or one scan; the lock is
//! never held across I/O.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// One agent's entry in the status table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotRecord {
    /// Whether an agent currently occupies this slot
    pub active: bool,
    /// Peer address of the occupying agent
    pub address: String,
    /// Last reported CPU usage, percent
    pub cpu_pct: f32,
    /// Last reported RAM usage, percent
    pub ram_pct: f32,
}

/// Fixed-capacity table of agent slots
pub struct StatusTable {
    slots: Mutex<Vec<SlotRecord>>,
    capacity: usize,
}

impl StatusTable {
    /// Create a table with `capacity` empty slots
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(vec![SlotRecord::default(); capacity]),
            capacity,
        }
    }

    /// Table capacity, fixed for the table's lifetime
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // A poisoned lock only means some holder panicked mid-update; the
    // records themselves stay usable.
    fn lock(&self) -> MutexGuard<'_, Vec<SlotRecord>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve the first free slot for `address`.
    ///
    /// Returns `None` when the table is full; the caller must refuse the
    /// connection.
    pub fn reserve(&self, address: &str) -> Option<usize> {
        let mut slots = self.lock();
        let index = slots.iter().position(|record| !record.active)?;
        slots[index] = SlotRecord {
            active: true,
            address: address.to_string(),
            cpu_pct: 0.0,
            ram_pct: 0.0,
        };
        Some(index)
    }

    /// Clear a slot back to empty. Idempotent; clearing a free slot or an
    /// out-of-range index is a no-op.
    pub fn clear(&self, slot: usize) {
        let mut slots = self.lock();
        if let Some(record) = slots.get_mut(slot) {
            *record = SlotRecord::default();
        }
    }

    /// Record a heartbeat sample for an occupied slot
    pub fn record_heartbeat(&self, slot: usize, cpu_pct: f32, ram_pct: f32) {
        let mut slots = self.lock();
        if let Some(record) = slots.get_mut(slot) {
            if record.active {
                record.cpu_pct = cpu_pct;
                record.ram_pct = ram_pct;
            }
        }
    }

    /// Read one slot record
    pub fn get(&self, slot: usize) -> Option<SlotRecord> {
        self.lock().get(slot).cloned()
    }

    /// Copy out all records for display.
    ///
    /// Each record is read under its own lock acquisition, so the aggregate
    /// view may be torn across concurrent updates. Acceptable for
    /// human-facing telemetry.
    pub fn snapshot(&self) -> Vec<SlotRecord> {
        (0..self.capacity)
            .map(|slot| self.lock()[slot].clone())
            .collect()
    }

    /// Number of currently occupied slots
    pub fn active_count(&self) -> usize {
        self.lock().iter().filter(|record| record.active).count()
    }
}
