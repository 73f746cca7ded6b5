//! Task entry contract, cancellation token and output sink
//!
//! Tasks are statically registered callables with a fixed signature:
//! positional string arguments, a cancellation token the task must poll
//! cooperatively, and a sink for streamed output. Cancellation is advisory;
//! a task that never polls the token runs to completion.

use sentinel_proto::Message;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors a task body may return
#[derive(Debug, Error)]
pub enum TaskError {
    /// Arguments did not match the task's expectations
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// The task body failed
    #[error("{0}")]
    Failed(String),
}

/// Cooperative cancellation signal.
///
/// Contract for task authors: poll [`CancelToken::is_cancelled`] at every
/// reasonable opportunity and return promptly once it reads true.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an unset token
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal. Idempotent; returns immediately.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One item pushed by a task or its supervisor
#[derive(Debug)]
pub enum TaskOutput {
    /// A bare output line; the agent loop wraps it into a `TaskResult`
    Line(String),
    /// A pre-tagged message, relayed with the task id filled only if absent
    Message(Message),
}

/// Output channel handed to a running task
#[derive(Clone)]
pub struct TaskSink {
    tx: mpsc::UnboundedSender<TaskOutput>,
}

impl TaskSink {
    /// Wrap a sender into a sink
    pub fn new(tx: mpsc::UnboundedSender<TaskOutput>) -> Self {
        Self { tx }
    }

    /// Push one bare output line. Send failures are ignored: the consumer
    /// going away just means nobody is listening any more.
    pub fn push(&self, line: impl Into<String>) {
        let _ = self.tx.send(TaskOutput::Line(line.into()));
    }

    /// Push a pre-tagged message
    pub fn push_message(&self, message: Message) {
        let _ = self.tx.send(TaskOutput::Message(message));
    }
}

/// A named, cancellable unit of work executed inside the agent process.
///
/// `run` is called on a blocking worker thread; it may block freely but
/// must honor the cancellation contract above.
pub trait Task: Send + Sync {
    /// Execute the task to completion or cancellation
    fn run(&self, args: &[String], cancel: &CancelToken, out: &TaskSink) -> Result<(), TaskError>;
}

/// Static mapping of task names to executable units
#[derive(Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<dyn Task>>,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task under `name`, replacing any previous entry
    pub fn register(&mut self, name: impl Into<String>, task: Arc<dyn Task>) {
        self.tasks.insert(name.into(), task);
    }

    /// Look up a task by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Task>> {
        self.tasks.get(name).cloned()
    }

    /// Registered task names
    pub fn names(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_is_sticky_and_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_sink_survives_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = TaskSink::new(tx);
        drop(rx);
        sink.push("nobody listening");
        sink.push_message(Message::End);
    }

    #[test]
    fn test_registry_lookup() {
        struct Noop;
        impl Task for Noop {
            fn run(&self, _: &[String], _: &CancelToken, _: &TaskSink) -> Result<(), TaskError> {
                Ok(())
            }
        }

        let mut registry = TaskRegistry::new();
        registry.register("noop", Arc::new(Noop));

        assert!(registry.get("noop").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["noop"]);
    }
}
