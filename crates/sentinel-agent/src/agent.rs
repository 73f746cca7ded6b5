//! Agent main loop and connection state machine
//!
//! The agent cycles `Disconnected -> Connecting -> Connected -> Disconnected`
//! with a fixed backoff, and only exits on an explicit `END` command. While
//! connected, one `select!` multiplexes the socket, the task output channel
//! and the heartbeat interval; every output wake drains the channel so task
//! output interleaves with heartbeats instead of queuing indefinitely.

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::runtime::TaskRuntime;
use crate::stats::SystemSampler;
use crate::task::{TaskOutput, TaskRegistry};
use sentinel_proto::{FrameCodec, Message, ProtocolError, TaskState};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep};
use tracing::{debug, info, warn};

/// How one connected session ended
#[derive(Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// Socket closed or failed; reconnect after backoff
    Disconnected,
    /// Explicit `END` received; the process should exit
    Terminate,
}

enum Flow {
    Continue,
    Terminate,
}

/// The agent process: reconnect loop around one connected session
pub struct AgentLoop {
    config: AgentConfig,
    registry: Arc<TaskRegistry>,
}

impl AgentLoop {
    /// Create an agent over a task registry
    pub fn new(config: AgentConfig, registry: TaskRegistry) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
        }
    }

    /// Run until an explicit `END` command arrives.
    ///
    /// Every connection failure, including refusal, falls back to the fixed
    /// reconnect backoff; nothing short of `END` is terminal.
    pub async fn run(&self) -> Result<(), AgentError> {
        loop {
            info!(addr = %self.config.master_addr, "connecting to master");
            match TcpStream::connect(&self.config.master_addr).await {
                Ok(stream) => match self.run_connection(stream).await {
                    Ok(SessionEnd::Terminate) => {
                        info!("END received, shutting down");
                        return Ok(());
                    }
                    Ok(SessionEnd::Disconnected) => {
                        warn!("disconnected from master");
                    }
                    Err(e) => {
                        warn!(error = %e, "session failed");
                    }
                },
                Err(e) => {
                    warn!(error = %e, "connection failed");
                }
            }
            sleep(self.config.reconnect_backoff).await;
        }
    }

    /// Run one connected session over an established stream
    pub async fn run_connection<S>(&self, stream: S) -> Result<SessionEnd, AgentError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut read_codec = FrameCodec::new();
        let write_codec = FrameCodec::new();

        let (output_tx, mut output_rx) = mpsc::unbounded_channel();
        let mut runtime = TaskRuntime::new(
            Arc::clone(&self.registry),
            self.config.allowed_tasks.iter().cloned(),
            output_tx,
        );
        let mut sampler = SystemSampler::new();
        let mut heartbeat = interval(self.config.heartbeat_interval);

        loop {
            tokio::select! {
                result = read_codec.read_message(&mut reader) => {
                    match result {
                        Ok(Some(message)) => {
                            match self.handle_command(message, &mut runtime, &write_codec, &mut writer).await? {
                                Flow::Continue => {}
                                Flow::Terminate => {
                                    writer.flush().await.ok();
                                    return Ok(SessionEnd::Terminate);
                                }
                            }
                        }
                        Ok(None) => return Ok(SessionEnd::Disconnected),
                        Err(e) if e.is_recoverable() => {
                            warn!(error = %e, "discarding undecodable message from master");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }

                item = output_rx.recv() => {
                    // The runtime holds a sender, so the channel never closes
                    // while this session lives.
                    if let Some(item) = item {
                        forward_output(item, &runtime, &write_codec, &mut writer).await?;
                        while let Ok(more) = output_rx.try_recv() {
                            forward_output(more, &runtime, &write_codec, &mut writer).await?;
                        }
                    }
                }

                _ = heartbeat.tick() => {
                    let (cpu, ram) = sampler.sample();
                    debug!(%cpu, %ram, "heartbeat");
                    write_codec
                        .write_message(&mut writer, &Message::heartbeat(cpu, ram))
                        .await?;
                }
            }
        }
    }

    async fn handle_command<W>(
        &self,
        message: Message,
        runtime: &mut TaskRuntime,
        codec: &FrameCodec,
        writer: &mut W,
    ) -> Result<Flow, AgentError>
    where
        W: AsyncWrite + Unpin,
    {
        match message {
            Message::Execute {
                task_id,
                task_name,
                args,
            } => {
                info!(%task_id, %task_name, ?args, "EXECUTE received");
                let reply = match runtime.start(&task_id, &task_name, args) {
                    Ok(()) => Message::task_status(
                        Some(task_id),
                        TaskState::Started,
                        Some(format!("task '{task_name}' started")),
                    ),
                    Err(e) => {
                        warn!(%task_name, error = %e, "task refused");
                        Message::task_status(Some(task_id), TaskState::Failed, Some(e.to_string()))
                    }
                };
                codec.write_message(writer, &reply).await?;
            }

            Message::StopTask => {
                info!("STOP_TASK received");
                let reply = if runtime.stop() {
                    Message::task_status(
                        runtime.current_task_id().map(str::to_string),
                        TaskState::Stopping,
                        None,
                    )
                } else {
                    Message::task_status(None, TaskState::NoTask, None)
                };
                codec.write_message(writer, &reply).await?;
            }

            Message::End => {
                runtime.stop();
                return Ok(Flow::Terminate);
            }

            other => {
                warn!(?other, "unexpected message from master");
            }
        }
        Ok(Flow::Continue)
    }
}

/// Turn one output-channel item into a wire message and send it
async fn forward_output<W>(
    item: TaskOutput,
    runtime: &TaskRuntime,
    codec: &FrameCodec,
    writer: &mut W,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let message = match item {
        TaskOutput::Line(data) => Message::TaskResult {
            task_id: runtime.current_task_id().map(str::to_string),
            stream: None,
            data,
        },
        TaskOutput::Message(message) => match runtime.current_task_id() {
            Some(id) => message.with_task_id_if_absent(id),
            None => message,
        },
    };
    codec.write_message(writer, &message).await
}
