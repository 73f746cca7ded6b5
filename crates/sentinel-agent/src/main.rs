//! Sentinel Agent Binary
//!
//! Connects to the master, reports health telemetry and executes tasks.

use anyhow::Result;
use clap::Parser;
use sentinel_agent::builtins::builtin_registry;
use sentinel_agent::{AgentConfig, AgentLoop};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sentinel-agent", about = "Sentinel remote agent")]
struct Args {
    /// Master server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Master server port
    #[arg(long, default_value_t = 13579)]
    port: u16,

    /// Heartbeat cadence in seconds
    #[arg(long, default_value_t = 2)]
    heartbeat: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = AgentConfig {
        master_addr: format!("{}:{}", args.host, args.port),
        heartbeat_interval: std::time::Duration::from_secs(args.heartbeat),
        ..AgentConfig::default()
    };

    info!("Starting Sentinel agent");

    let registry = builtin_registry();
    let agent = AgentLoop::new(config, registry);
    agent.run().await?;

    info!("Agent shut down");
    Ok(())
}
