//! Agent configuration

use std::time::Duration;

/// Default master address
pub const DEFAULT_MASTER_ADDR: &str = "127.0.0.1:13579";

/// Default heartbeat cadence
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// Default delay before reconnecting after a lost connection
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Agent process configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Master collector address (`host:port`)
    pub master_addr: String,
    /// Heartbeat cadence, independent of task activity
    pub heartbeat_interval: Duration,
    /// Fixed backoff between reconnect attempts
    pub reconnect_backoff: Duration,
    /// Allow-list of task names this agent will execute
    pub allowed_tasks: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            master_addr: DEFAULT_MASTER_ADDR.to_string(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            allowed_tasks: vec!["ticker".to_string(), "hashcrack".to_string()],
        }
    }
}
