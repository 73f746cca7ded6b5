//! # Sentinel Master
//!
//! The central collector: accepts agent connections, tracks per-agent health
//! in a fixed-capacity status table, and routes operator commands to the
//! connection handler occupying the target slot.

#![warn(missing_docs)]

/// Master configuration
pub mod config;

/// Shared agent status table
pub mod table;

/// Per-slot outbound mailboxes
pub mod mailbox;

/// Per-connection handler loop
pub mod handler;

/// Operator command dispatcher
pub mod dispatch;

/// Collector accept loop
pub mod collector;

/// Read-only HTTP status dashboard
pub mod dashboard;

/// Operator console parsing
pub mod console;

/// Error types for master operations
pub mod error;

pub use collector::Collector;
pub use config::MasterConfig;
pub use dispatch::Command;
pub use error::MasterError;
pub use mailbox::MailboxRegistry;
pub use table::{SlotRecord, StatusTable};
