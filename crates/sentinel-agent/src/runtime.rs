//! Cancellable single-task runtime
//!
//! At most one task runs per agent process. The worker executes on a
//! blocking thread; a supervisor task awaits its join handle and turns the
//! outcome into a terminal `TaskStatus`, so a panicking task body is
//! isolated from the agent and still produces `ERROR`.

use crate::task::{CancelToken, TaskOutput, TaskRegistry, TaskSink};
use sentinel_proto::{Message, TaskState};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Why a task could not be started
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartError {
    /// Name absent from the allow-list
    #[error("unauthorized task: {0}")]
    Unauthorized(String),

    /// Allowed name with no registered executable unit
    #[error("task not found: {0}")]
    NotFound(String),

    /// A task is already active
    #[error("task already running")]
    AlreadyRunning,
}

/// Handle to the task currently bound to this agent
struct TaskHandle {
    task_id: String,
    cancel: CancelToken,
    done: Arc<AtomicBool>,
}

/// Single-slot task runtime
pub struct TaskRuntime {
    registry: Arc<TaskRegistry>,
    allowed: HashSet<String>,
    output_tx: mpsc::UnboundedSender<TaskOutput>,
    current: Option<TaskHandle>,
}

impl TaskRuntime {
    /// Create a runtime over `registry`, restricted to `allowed` names,
    /// emitting output and terminal statuses on `output_tx`
    pub fn new(
        registry: Arc<TaskRegistry>,
        allowed: impl IntoIterator<Item = String>,
        output_tx: mpsc::UnboundedSender<TaskOutput>,
    ) -> Self {
        Self {
            registry,
            allowed: allowed.into_iter().collect(),
            output_tx,
            current: None,
        }
    }

    /// Whether a task is currently alive
    pub fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|handle| !handle.done.load(Ordering::Acquire))
    }

    /// Correlation id of the most recently started task.
    ///
    /// Stays available after completion so late output lines can still be
    /// stamped.
    pub fn current_task_id(&self) -> Option<&str> {
        self.current.as_ref().map(|handle| handle.task_id.as_str())
    }

    /// Start a named task bound to `(task_id, args)`.
    ///
    /// Fails without side effects when the name is not allowed, not
    /// registered, or a task is already running.
    pub fn start(
        &mut self,
        task_id: &str,
        task_name: &str,
        args: Vec<String>,
    ) -> Result<(), StartError> {
        if self.is_running() {
            return Err(StartError::AlreadyRunning);
        }
        if !self.allowed.contains(task_name) {
            return Err(StartError::Unauthorized(task_name.to_string()));
        }
        let task = self
            .registry
            .get(task_name)
            .ok_or_else(|| StartError::NotFound(task_name.to_string()))?;

        let cancel = CancelToken::new();
        let done = Arc::new(AtomicBool::new(false));
        let sink = TaskSink::new(self.output_tx.clone());

        let worker_cancel = cancel.clone();
        let worker = tokio::task::spawn_blocking(move || {
            task.run(&args, &worker_cancel, &sink)
        });

        // Supervisor: the mandatory failure boundary around the task body.
        let supervisor_done = Arc::clone(&done);
        let supervisor_tx = self.output_tx.clone();
        let supervisor_id = task_id.to_string();
        tokio::spawn(async move {
            let (status, detail) = match worker.await {
                Ok(Ok(())) => (TaskState::Completed, None),
                Ok(Err(e)) => (TaskState::Error, Some(e.to_string())),
                Err(join_error) => {
                    let detail = if join_error.is_panic() {
                        panic_message(join_error.into_panic())
                    } else {
                        join_error.to_string()
                    };
                    (TaskState::Error, Some(detail))
                }
            };
            if status == TaskState::Error {
                warn!(task_id = %supervisor_id, detail = detail.as_deref().unwrap_or("-"), "task failed");
            } else {
                info!(task_id = %supervisor_id, "task completed");
            }
            supervisor_done.store(true, Ordering::Release);
            let _ = supervisor_tx.send(TaskOutput::Message(Message::task_status(
                Some(supervisor_id),
                status,
                detail,
            )));
        });

        self.current = Some(TaskHandle {
            task_id: task_id.to_string(),
            cancel,
            done,
        });
        Ok(())
    }

    /// Signal cancellation to the running task, without joining it.
    ///
    /// Returns `false` when no task is active. The terminal status still
    /// arrives through the output channel once the worker exits.
    pub fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        if let Some(handle) = &self.current {
            handle.cancel.cancel();
            info!(task_id = %handle.task_id, "cancellation requested");
        }
        true
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::builtin_registry;
    use crate::task::{Task, TaskError};
    use std::time::Duration;
    use tokio::time::timeout;

    struct Panicker;
    impl Task for Panicker {
        fn run(&self, _: &[String], _: &CancelToken, _: &TaskSink) -> Result<(), TaskError> {
            panic!("worker blew up");
        }
    }

    struct Blocker;
    impl Task for Blocker {
        fn run(&self, _: &[String], cancel: &CancelToken, out: &TaskSink) -> Result<(), TaskError> {
            while !cancel.is_cancelled() {
                std::thread::sleep(Duration::from_millis(10));
            }
            out.push("blocker exiting");
            Ok(())
        }
    }

    fn runtime_with(
        registry: TaskRegistry,
        allowed: &[&str],
    ) -> (TaskRuntime, mpsc::UnboundedReceiver<TaskOutput>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runtime = TaskRuntime::new(
            Arc::new(registry),
            allowed.iter().map(|s| s.to_string()),
            tx,
        );
        (runtime, rx)
    }

    async fn wait_terminal(rx: &mut mpsc::UnboundedReceiver<TaskOutput>) -> Message {
        loop {
            let item = timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("terminal status within deadline")
                .expect("channel open");
            if let TaskOutput::Message(msg @ Message::TaskStatus { .. }) = item {
                return msg;
            }
        }
    }

    #[tokio::test]
    async fn test_unauthorized_and_missing_tasks_fail() {
        let mut registry = builtin_registry();
        registry.register("ghost-replacement", Arc::new(Blocker));
        let (mut runtime, _rx) = runtime_with(registry, &["ticker", "ghost"]);

        assert_eq!(
            runtime.start("t-1", "hashcrack", vec![]),
            Err(StartError::Unauthorized("hashcrack".into()))
        );
        assert_eq!(
            runtime.start("t-1", "ghost", vec![]),
            Err(StartError::NotFound("ghost".into()))
        );
        assert!(!runtime.is_running());
    }

    #[tokio::test]
    async fn test_second_execute_fails_then_succeeds_after_completion() {
        let mut registry = TaskRegistry::new();
        registry.register("blocker", Arc::new(Blocker));
        let (mut runtime, mut rx) = runtime_with(registry, &["blocker"]);

        runtime.start("t-1", "blocker", vec![]).unwrap();
        assert_eq!(
            runtime.start("t-2", "blocker", vec![]),
            Err(StartError::AlreadyRunning)
        );

        assert!(runtime.stop());
        let status = wait_terminal(&mut rx).await;
        assert!(matches!(
            status,
            Message::TaskStatus {
                status: TaskState::Completed,
                ..
            }
        ));

        // Slot is free again once the worker reported terminal status.
        runtime.start("t-3", "blocker", vec![]).unwrap();
        runtime.stop();
    }

    #[tokio::test]
    async fn test_stop_with_no_task_returns_false() {
        let (mut runtime, _rx) = runtime_with(builtin_registry(), &["ticker"]);
        assert!(!runtime.stop());
    }

    #[tokio::test]
    async fn test_panic_is_isolated_and_reported() {
        let mut registry = TaskRegistry::new();
        registry.register("panicker", Arc::new(Panicker));
        let (mut runtime, mut rx) = runtime_with(registry, &["panicker"]);

        runtime.start("t-9", "panicker", vec![]).unwrap();

        let status = wait_terminal(&mut rx).await;
        match status {
            Message::TaskStatus {
                task_id,
                status,
                info,
            } => {
                assert_eq!(task_id.as_deref(), Some("t-9"));
                assert_eq!(status, TaskState::Error);
                assert_eq!(info.as_deref(), Some("worker blew up"));
            }
            other => panic!("expected TaskStatus, got {other:?}"),
        }
        assert!(!runtime.is_running());
    }

    #[tokio::test]
    async fn test_task_error_reported_with_info() {
        let (mut runtime, mut rx) = runtime_with(builtin_registry(), &["hashcrack"]);

        // Bad args make the task body return an error immediately.
        runtime.start("t-5", "hashcrack", vec![]).unwrap();

        let status = wait_terminal(&mut rx).await;
        match status {
            Message::TaskStatus { status, info, .. } => {
                assert_eq!(status, TaskState::Error);
                assert!(info.unwrap().contains("invalid arguments"));
            }
            other => panic!("expected TaskStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_task_emits_output_then_terminal_status() {
        let mut registry = TaskRegistry::new();
        registry.register("blocker", Arc::new(Blocker));
        let (mut runtime, mut rx) = runtime_with(registry, &["blocker"]);

        runtime.start("t-7", "blocker", vec![]).unwrap();
        assert!(runtime.is_running());
        assert!(runtime.stop());

        let mut saw_line = false;
        loop {
            let item = timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            match item {
                TaskOutput::Line(line) => {
                    assert_eq!(line, "blocker exiting");
                    saw_line = true;
                }
                TaskOutput::Message(Message::TaskStatus { status, .. }) => {
                    assert_eq!(status, TaskState::Completed);
                    break;
                }
                other => panic!("unexpected item {other:?}"),
            }
        }
        assert!(saw_line);
        assert!(!runtime.is_running());
        assert_eq!(runtime.current_task_id(), Some("t-7"));
    }
}
