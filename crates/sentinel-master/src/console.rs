//! Operator console parsing
//!
//! Turns `exec <slot> <task> [args...]`, `stop <slot>` and `end <slot>`
//! lines into [`Command`]s. Parsing is pure; the stdin loop feeds the
//! dispatcher queue and never stops on a bad line.

use crate::Command;
use sentinel_proto::Message;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// A line the console could not turn into a command
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// First word is not a known verb
    #[error("unknown verb '{0}'")]
    UnknownVerb(String),
    /// Slot argument missing or not a number
    #[error("missing or invalid slot in '{0}'")]
    BadSlot(String),
    /// Exec line without a task name
    #[error("exec requires a task name")]
    MissingTaskName,
}

fn next_slot(
    words: &mut std::str::SplitWhitespace<'_>,
    line: &str,
) -> Result<usize, ParseError> {
    words
        .next()
        .and_then(|w| w.parse::<usize>().ok())
        .ok_or_else(|| ParseError::BadSlot(line.to_string()))
}

/// Parse one console line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Command>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    match verb {
        "exec" => {
            let slot = next_slot(&mut words, line)?;
            let name = words.next().ok_or(ParseError::MissingTaskName)?;
            let args: Vec<String> = words.map(str::to_string).collect();
            let task_id = Uuid::new_v4().to_string();
            Ok(Some(Command::new(
                slot,
                Message::execute(task_id, name, args),
            )))
        }
        "stop" => Ok(Some(Command::new(
            next_slot(&mut words, line)?,
            Message::StopTask,
        ))),
        "end" => Ok(Some(Command::new(
            next_slot(&mut words, line)?,
            Message::End,
        ))),
        other => Err(ParseError::UnknownVerb(other.to_string())),
    }
}

/// Read operator lines from stdin until EOF, feeding the dispatcher queue
pub async fn run_console(commands: mpsc::UnboundedSender<Command>) {
    info!("console ready: exec <slot> <task> [args...] | stop <slot> | end <slot>");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_line(&line) {
                Ok(Some(command)) => {
                    info!(slot = command.target_slot, "command queued");
                    if commands.send(command).is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "ignoring console line"),
            },
            Ok(None) => return,
            Err(e) => {
                error!(error = %e, "console read failed");
                return;
            }
        }
    }
}
