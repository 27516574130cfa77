//! Kontrol relay daemon
//!
//! Keeps the configured OSC peers in sync: one broadcaster per peer, periodic
//! keep-alive polling, and pruning of peers that stop answering pings.

use anyhow::{Context, Result};
use clap::Parser;
use kontrol_daemon::{listener, DaemonConfig, PeerDefaults, PeerRegistry};
use kontrol_model::{ChangeSource, KontrolCallback};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kontrol-relay", version, about = "Broadcast Kontrol rack state to OSC peers")]
struct Args {
    /// Configuration file (default: <config dir>/kontrol/relay.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DaemonConfig::load_from(path),
        None => DaemonConfig::load(),
    }
    .context("Failed to load configuration")?;

    if args.print_config {
        println!("{}", toml::to_string_pretty(&config).context("Failed to serialize config")?);
        return Ok(());
    }

    info!("Starting Kontrol relay v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config.config_path.display());

    let registry = Arc::new(PeerRegistry::new(PeerDefaults::from(&config)));
    for peer in &config.peers {
        if let Err(e) = registry.add_peer(peer) {
            warn!("Skipping peer {}:{}: {}", peer.host, peer.port, e);
        }
    }
    info!("{} peer(s) registered", registry.len());

    if let Some(rack) = &config.demo_rack {
        info!("Publishing rack {}", rack.id);
        registry.publish(&ChangeSource::local(), std::slice::from_ref(rack));
    }

    match UdpSocket::bind(("0.0.0.0", config.announce_port)).await {
        Ok(socket) => {
            info!("Listening for pings on port {}", config.announce_port);
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                if let Err(e) = listener::run(socket, registry).await {
                    error!("Ping listener failed: {}", e);
                }
            });
        }
        Err(e) => warn!(
            "Cannot listen on port {} ({}), peers will expire without pings",
            config.announce_port, e
        ),
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = registry.poll();
                if removed > 0 {
                    info!("{} peer(s) removed, {} remaining", removed, registry.len());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    info!("Shutting down...");
    registry.stop();
    info!("Kontrol relay stopped");

    Ok(())
}
