//! Message types and enums

use serde::{Deserialize, Serialize};

/// Terminal and transitional states reported for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// Task accepted and worker spawned
    Started,
    /// Task could not be started
    Failed,
    /// Cancellation signal set, worker still winding down
    Stopping,
    /// Stop requested while no task was active
    NoTask,
    /// Task body returned normally
    Completed,
    /// Task body failed or panicked
    Error,
}

/// Tagged message envelope exchanged between master and agent.
///
/// On the wire this keeps the `{type, payload}` shape: the variant name is
/// the `type` tag, the fields are the `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Periodic health sample from an agent
    Heartbeat {
        /// Instantaneous CPU usage, percent
        cpu: f32,
        /// Instantaneous RAM usage, percent
        ram: f32,
    },

    /// Start a named task on the receiving agent
    Execute {
        /// Correlation id, unique for the agent process lifetime
        task_id: String,
        /// Name resolved against the agent's allow-list
        task_name: String,
        /// Positional string arguments for the task entry point
        args: Vec<String>,
    },

    /// Cancel the currently running task, if any
    StopTask,

    /// Terminate the agent process
    End,

    /// Lifecycle report for a task
    TaskStatus {
        /// Correlation id; absent for stop replies that have no task
        task_id: Option<String>,
        /// Reported state
        status: TaskState,
        /// Human-readable detail
        info: Option<String>,
    },

    /// One item of streamed task output
    TaskResult {
        /// Correlation id; stamped by the agent when the task omits it
        task_id: Option<String>,
        /// Opaque stream tag (left uninterpreted by the control plane)
        stream: Option<String>,
        /// Output payload
        data: String,
    },
}

impl Message {
    /// Create a heartbeat message
    pub fn heartbeat(cpu: f32, ram: f32) -> Self {
        Self::Heartbeat { cpu, ram }
    }

    /// Create an execute command
    pub fn execute(
        task_id: impl Into<String>,
        task_name: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self::Execute {
            task_id: task_id.into(),
            task_name: task_name.into(),
            args,
        }
    }

    /// Create a task status report
    pub fn task_status(
        task_id: Option<String>,
        status: TaskState,
        info: Option<String>,
    ) -> Self {
        Self::TaskStatus {
            task_id,
            status,
            info,
        }
    }

    /// Create a bare task result carrying one output line
    pub fn task_result(task_id: impl Into<String>, data: impl Into<String>) -> Self {
        Self::TaskResult {
            task_id: Some(task_id.into()),
            stream: None,
            data: data.into(),
        }
    }

    /// The task correlation id carried by this message, if any
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Execute { task_id, .. } => Some(task_id),
            Self::TaskStatus { task_id, .. } | Self::TaskResult { task_id, .. } => {
                task_id.as_deref()
            }
            _ => None,
        }
    }

    /// Stamp a task id onto a status/result message that lacks one.
    ///
    /// Messages already carrying an id, and variants without an id field,
    /// pass through unchanged.
    pub fn with_task_id_if_absent(mut self, id: &str) -> Self {
        match &mut self {
            Self::TaskStatus { task_id, .. } | Self::TaskResult { task_id, .. } => {
                if task_id.is_none() {
                    *task_id = Some(id.to_string());
                }
            }
            _ => {}
        }
        self
    }
}
