//! Collector accept loop
//!
//! Accepts agent connections, reserves a status-table slot for each, and
//! spawns one handler task per connection. A full table refuses the new
//! connection immediately; a failing handler never affects its siblings.

use crate::handler::{run_handler, HandlerContext};
use crate::{MailboxRegistry, MasterConfig, MasterError, StatusTable};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// The collector half of the master: listener plus shared state
pub struct Collector {
    listener: TcpListener,
    table: Arc<StatusTable>,
    mailboxes: Arc<MailboxRegistry>,
    config: MasterConfig,
}

impl Collector {
    /// Bind the collector listener. Failure here is fatal to the master.
    pub async fn bind(
        config: MasterConfig,
        table: Arc<StatusTable>,
        mailboxes: Arc<MailboxRegistry>,
    ) -> Result<Self, MasterError> {
        let listener = TcpListener::bind(config.listen_addr).await?;
        info!(addr = %config.listen_addr, "collector listening");
        Ok(Self {
            listener,
            table,
            mailboxes,
            config,
        })
    }

    /// The address actually bound (useful when the port was 0)
    pub fn local_addr(&self) -> Result<SocketAddr, MasterError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever
    pub async fn run(self) -> Result<(), MasterError> {
        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };

            let Some(slot) = self.table.reserve(&addr.to_string()) else {
                warn!(%addr, "status table full, refusing connection");
                drop(stream);
                continue;
            };
            info!(%addr, slot, "agent connected");

            let mailbox = self.mailboxes.register(slot);
            let ctx = HandlerContext {
                slot,
                table: Arc::clone(&self.table),
                mailboxes: Arc::clone(&self.mailboxes),
                idle_timeout: self.config.idle_timeout,
            };
            tokio::spawn(run_handler(ctx, stream, mailbox));
        }
    }
}
