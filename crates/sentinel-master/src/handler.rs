//! Per-connection handler loop
//!
//! One handler runs per accepted agent connection, from slot reservation to
//! teardown. Its event loop awaits the socket and this slot's mailbox in one
//! `select!`, bounded by the idle-timeout deadline. Teardown (clear slot,
//! drop mailbox seat, close socket) runs on every exit path exactly once.

use crate::{MailboxRegistry, StatusTable};
use sentinel_proto::{FrameCodec, Message, ProtocolError};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Why a handler's event loop ended
#[derive(Debug, PartialEq, Eq)]
pub enum HandlerExit {
    /// Peer closed the connection on a frame boundary
    PeerClosed,
    /// No bytes received within the idle window
    IdleTimeout,
    /// Stream died mid-frame or with an I/O error
    ConnectionLost,
}

/// Everything a handler needs besides the socket itself
pub struct HandlerContext {
    /// Slot index, fixed for the handler's entire life
    pub slot: usize,
    /// Shared status table
    pub table: Arc<StatusTable>,
    /// Mailbox registry, for teardown deregistration
    pub mailboxes: Arc<MailboxRegistry>,
    /// Idle window since the last byte received from the agent
    pub idle_timeout: Duration,
}

/// Run one connection handler to completion.
///
/// Never returns early without teardown: the slot is cleared and the mailbox
/// seat dropped on every exit path, and the socket closes when the stream is
/// dropped here.
pub async fn run_handler<S>(
    ctx: HandlerContext,
    stream: S,
    mailbox: mpsc::UnboundedReceiver<Message>,
) -> HandlerExit
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let exit = handler_loop(&ctx, stream, mailbox).await;

    ctx.mailboxes.deregister(ctx.slot);
    ctx.table.clear(ctx.slot);
    info!(slot = ctx.slot, ?exit, "handler torn down");

    exit
}

async fn handler_loop<S>(
    ctx: &HandlerContext,
    stream: S,
    mut mailbox: mpsc::UnboundedReceiver<Message>,
) -> HandlerExit
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut read_codec = FrameCodec::new();
    let write_codec = FrameCodec::new();
    let mut last_active = Instant::now();

    loop {
        let deadline = last_active + ctx.idle_timeout;

        tokio::select! {
            result = read_codec.read_message(&mut reader) => {
                match result {
                    Ok(Some(message)) => {
                        last_active = Instant::now();
                        handle_inbound(ctx, message);
                    }
                    Ok(None) => {
                        info!(slot = ctx.slot, "agent closed connection");
                        return HandlerExit::PeerClosed;
                    }
                    Err(e) if e.is_recoverable() => {
                        // The frame was consumed; the stream is still aligned.
                        warn!(slot = ctx.slot, error = %e, "discarding undecodable message");
                        last_active = Instant::now();
                    }
                    Err(e) => {
                        warn!(slot = ctx.slot, error = %e, "connection lost");
                        return HandlerExit::ConnectionLost;
                    }
                }
            }

            queued = mailbox.recv() => {
                let Some(first) = queued else {
                    // Seat replaced by a new occupant; this handler is stale.
                    return HandlerExit::ConnectionLost;
                };
                if let Err(e) = drain_mailbox(ctx, &write_codec, &mut writer, first, &mut mailbox).await {
                    warn!(slot = ctx.slot, error = %e, "write to agent failed");
                    return HandlerExit::ConnectionLost;
                }
            }

            _ = sleep_until(deadline) => {
                warn!(slot = ctx.slot, "agent idle past timeout");
                return HandlerExit::IdleTimeout;
            }
        }
    }
}

/// Write `first` plus everything else currently queued, in FIFO order
async fn drain_mailbox<W>(
    ctx: &HandlerContext,
    codec: &FrameCodec,
    writer: &mut W,
    first: Message,
    mailbox: &mut mpsc::UnboundedReceiver<Message>,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    debug!(slot = ctx.slot, "forwarding queued command");
    codec.write_message(writer, &first).await?;
    while let Ok(next) = mailbox.try_recv() {
        codec.write_message(writer, &next).await?;
    }
    Ok(())
}

/// Dispatch one decoded agent message by tag
fn handle_inbound(ctx: &HandlerContext, message: Message) {
    match message {
        Message::Heartbeat { cpu, ram } => {
            ctx.table.record_heartbeat(ctx.slot, cpu, ram);
            debug!(slot = ctx.slot, %cpu, %ram, "heartbeat");
        }
        Message::TaskResult { task_id, stream, data } => {
            // Surfaced tagged with the slot so concurrent agents' output
            // streams stay distinguishable.
            info!(
                slot = ctx.slot,
                task_id = task_id.as_deref().unwrap_or("-"),
                stream = stream.as_deref().unwrap_or("-"),
                "{data}"
            );
        }
        Message::TaskStatus { task_id, status, info } => {
            info!(
                slot = ctx.slot,
                task_id = task_id.as_deref().unwrap_or("-"),
                ?status,
                info = info.as_deref().unwrap_or("-"),
                "task status"
            );
        }
        other => {
            warn!(slot = ctx.slot, ?other, "unexpected message from agent");
        }
    }
}
