//! Sentinel Master Binary
//!
//! Central process: collector, dispatcher, dashboard and operator console.

use anyhow::Result;
use clap::Parser;
use sentinel_master::{
    collector::Collector, config, console, dashboard, dispatch, MailboxRegistry, MasterConfig,
    StatusTable,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "sentinel-master", about = "Sentinel fleet control plane master")]
struct Args {
    /// Collector listen address
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Collector listen port
    #[arg(long, default_value_t = config::DEFAULT_COLLECTOR_PORT)]
    port: u16,

    /// Dashboard listen address
    #[arg(long, default_value = "127.0.0.1:8080")]
    dashboard: SocketAddr,

    /// Maximum number of simultaneously connected agents
    #[arg(long, default_value_t = config::DEFAULT_MAX_CLIENTS)]
    max_clients: usize,

    /// Seconds of agent silence before the slot is reclaimed
    #[arg(long, default_value_t = 10)]
    idle_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = MasterConfig {
        listen_addr: SocketAddr::new(args.host, args.port),
        dashboard_addr: args.dashboard,
        max_clients: args.max_clients,
        idle_timeout: Duration::from_secs(args.idle_timeout),
    };

    info!("Starting Sentinel master");

    let table = Arc::new(StatusTable::new(config.max_clients));
    let mailboxes = Arc::new(MailboxRegistry::new(config.max_clients));
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    tokio::spawn(dispatch::run_dispatcher(command_rx, Arc::clone(&mailboxes)));
    tokio::spawn(console::run_console(command_tx));

    let dashboard_table = Arc::clone(&table);
    let dashboard_addr = config.dashboard_addr;
    tokio::spawn(async move {
        if let Err(e) = dashboard::run_dashboard(dashboard_addr, dashboard_table).await {
            error!(error = %e, "dashboard failed");
        }
    });

    // Bind failure is the one fatal startup error.
    let collector = Collector::bind(config, table, mailboxes).await?;
    collector.run().await?;

    Ok(())
}
