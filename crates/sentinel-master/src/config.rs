//! Master configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Default collector listen port
pub const DEFAULT_COLLECTOR_PORT: u16 = 13579;

/// Default dashboard listen port
pub const DEFAULT_DASHBOARD_PORT: u16 = 8080;

/// Default number of agent slots
pub const DEFAULT_MAX_CLIENTS: usize = 10;

/// Default idle timeout before a silent agent is disconnected
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Master process configuration
#[derive(Debug, Clone)]
pub struct MasterConfig {
    /// Collector listen address
    pub listen_addr: SocketAddr,
    /// Dashboard listen address
    pub dashboard_addr: SocketAddr,
    /// Fixed status table capacity
    pub max_clients: usize,
    /// Disconnect an agent after this long without a received byte
    pub idle_timeout: Duration,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_COLLECTOR_PORT)),
            dashboard_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_DASHBOARD_PORT)),
            max_clients: DEFAULT_MAX_CLIENTS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}
