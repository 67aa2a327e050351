use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use request_gatekeeper::auth::AuthenticatorRegistry;
use request_gatekeeper::config::{load_config, ConfigWatcher, GatekeeperConfig};
use request_gatekeeper::lifecycle::{signals, Shutdown};
use request_gatekeeper::observability::{init_metrics, init_tracing};
use request_gatekeeper::HttpServer;

#[derive(Parser)]
#[command(name = "request-gatekeeper")]
#[command(about = "Policy-driven request gatekeeper", long_about = None)]
struct Args {
    /// Path to the TOML configuration. Without it, every request gets 404.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the configuration when the file changes.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatekeeperConfig::default(),
    };

    init_tracing(&config.observability.log_level);
    tracing::info!("request-gatekeeper v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        patterns = config.permissions.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // Keep the watcher handle alive for the lifetime of the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) if args.watch => {
            let (watcher, updates) = ConfigWatcher::new(path, AuthenticatorRegistry::new());
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(signals::listen(shutdown.clone()));

    HttpServer::new(config).run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
