use anyhow::{Context, Result};
use clap::Parser;
use interview_api::config::Config;
use interview_api::{build_state, create_router};
use std::net::SocketAddr;
use tracing_subscriber::fmt::time::ChronoLocal;

/// Mock interview practice server.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Address to listen on, overrides BIND_ADDRESS
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Disable speech output and microphone input
    #[arg(long)]
    no_voice: bool,
    /// Print the available audio devices and exit
    #[arg(long)]
    list_devices: bool,
}

impl Cli {
    fn override_for(&self, key: &str) -> Option<String> {
        match key {
            "BIND_ADDRESS" => self.bind.map(|addr| addr.to_string()),
            "VOICE_ENABLED" if self.no_voice => Some("false".to_string()),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_devices {
        println!("Input devices:\n{}", interview_native_utils::device::get_available_inputs()?);
        println!("Output devices:\n{}", interview_native_utils::device::get_available_outputs()?);
        return Ok(());
    }

    // --- 1. Load Configuration ---
    let config =
        Config::from_env(|key| cli.override_for(key)).context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting interview server...");

    // --- 3. Wire the application ---
    let addr = config.bind_address;
    let static_dir = config.static_dir.clone();
    let state = build_state(config).context("Failed to initialize application state")?;
    let app = create_router(state, &static_dir);

    // --- 4. Serve ---
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
