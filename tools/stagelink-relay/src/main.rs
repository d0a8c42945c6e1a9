//! StageLink Relay Server
//!
//! A standalone relay that accepts device connections and fans
//! envelopes out between them.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use stagelink_relay::{Relay, RelayConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stagelink-relay")]
#[command(about = "StageLink Relay Server")]
#[command(version)]
struct Cli {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Relay name, shown in logs
    #[arg(short, long, default_value = "StageLink Relay")]
    name: String,

    /// Maximum concurrent sessions
    #[arg(long, default_value_t = 16)]
    max_sessions: usize,

    /// Evict connections silent for this many seconds
    #[arg(long, default_value_t = 15)]
    heartbeat_timeout: u64,

    /// Reject duplicate roles instead of replacing the stale holder
    #[arg(long)]
    strict_roles: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting StageLink Relay");
    tracing::info!("Listening on: {}", cli.listen);

    let config = RelayConfig {
        name: cli.name,
        max_sessions: cli.max_sessions,
        heartbeat_timeout: Duration::from_secs(cli.heartbeat_timeout),
        strict_roles: cli.strict_roles,
        ..Default::default()
    };

    let relay = Relay::new(config);

    tracing::info!("Relay ready, accepting connections...");

    // Run until interrupted
    let addr_str = cli.listen.to_string();
    relay.serve_websocket(&addr_str).await?;

    Ok(())
}
