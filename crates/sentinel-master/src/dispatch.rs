//! Operator command dispatcher
//!
//! One long-lived task owns the global inbound command queue and routes each
//! command to the mailbox of its target slot. No command, however malformed
//! or misaddressed, may terminate the dispatcher.

use crate::MailboxRegistry;
use sentinel_proto::Message;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One operator intent: a message addressed to a slot
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Target slot index
    pub target_slot: usize,
    /// Message to enqueue for that slot's handler
    pub message: Message,
}

impl Command {
    /// Create a command
    pub fn new(target_slot: usize, message: Message) -> Self {
        Self {
            target_slot,
            message,
        }
    }
}

/// Run the dispatcher until the command queue is closed
pub async fn run_dispatcher(
    mut commands: mpsc::UnboundedReceiver<Command>,
    mailboxes: Arc<MailboxRegistry>,
) {
    while let Some(command) = commands.recv().await {
        let slot = command.target_slot;
        match mailboxes.deliver(slot, command.message) {
            Ok(()) => debug!(slot, "command routed"),
            Err(e) => warn!(slot, error = %e, "command dropped"),
        }
    }
    debug!("command queue closed, dispatcher stopping");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_routes_to_target_slot_only() {
        let mailboxes = Arc::new(MailboxRegistry::new(4));
        let mut rx0 = mailboxes.register(0);
        let mut rx2 = mailboxes.register(2);

        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(run_dispatcher(rx, Arc::clone(&mailboxes)));

        tx.send(Command::new(2, Message::StopTask)).unwrap();
        drop(tx);
        dispatcher.await.unwrap();

        assert_eq!(rx2.try_recv().unwrap(), Message::StopTask);
        assert!(rx0.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_survives_invalid_and_vacant_slots() {
        let mailboxes = Arc::new(MailboxRegistry::new(2));
        let mut rx1 = mailboxes.register(1);

        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(run_dispatcher(rx, Arc::clone(&mailboxes)));

        // Out of range, vacant, then a valid command. The bad ones must not
        // take the dispatcher down or disturb later routing.
        tx.send(Command::new(99, Message::End)).unwrap();
        tx.send(Command::new(0, Message::End)).unwrap();
        tx.send(Command::new(1, Message::execute("t-1", "ticker", vec![])))
            .unwrap();
        drop(tx);

        timeout(Duration::from_secs(1), dispatcher)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(rx1.try_recv().unwrap().task_id(), Some("t-1"));
    }

    #[tokio::test]
    async fn test_back_to_back_commands_keep_issue_order() {
        let mailboxes = Arc::new(MailboxRegistry::new(1));
        let mut rx0 = mailboxes.register(0);

        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(run_dispatcher(rx, Arc::clone(&mailboxes)));

        for i in 0..10 {
            tx.send(Command::new(0, Message::execute(format!("t-{i}"), "ticker", vec![])))
                .unwrap();
        }
        drop(tx);
        dispatcher.await.unwrap();

        for i in 0..10 {
            assert_eq!(
                rx0.try_recv().unwrap().task_id(),
                Some(format!("t-{i}").as_str())
            );
        }
    }
}
