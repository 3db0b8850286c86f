use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use nexus_config::{find_config_path, load_config};
use nexus_core::{AgentRegistry, Invoker};
use nexus_server::{AgentServer, AppState};
use tracing::info;

/// Line printed on stdout once the listener is bound. The host process waits
/// for it before sending requests.
const READY_TOKEN: &str = "ADK_READY";

#[derive(Parser)]
#[command(
    name = "nexus-agent-server",
    about = "Local HTTP control plane for registering and running agents",
    version
)]
struct Cli {
    /// Port to listen on (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_ansi(false)
        .with_writer(std::io::stdout)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(find_config_path);
    let mut config = load_config(&config_path)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let invoker = Invoker::from_config(&config)?;
    let runtime = invoker.capabilities().runtime;
    let state = AppState::new(Arc::new(AgentRegistry::new()), invoker);
    let server = AgentServer::new(config.server.clone(), state);

    let addr = server.start().await?;
    info!(
        "Starting on port {} (runtime: {})",
        addr.port(),
        if runtime { "available" } else { "not available" }
    );

    let mut stdout = std::io::stdout();
    writeln!(stdout, "{READY_TOKEN}")?;
    stdout.flush()?;

    shutdown_signal().await;
    info!("Shutting down");
    server.stop().await?;
    Ok(())
}

/// Resolves on Ctrl-C, or on SIGTERM where the host stops its child that way.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
