use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use place_log::backend::RestClient;
use place_log::config::AppConfig;
use place_log::dashboard;
use place_log::presence::{ConnectionState, PresenceView};
use place_log::probe::StatusProbe;

#[derive(Debug, Parser)]
#[command(name = "place_log", version, about = "Place Adventure Log status screen")]
struct Cli {
    /// TOML config file; the built-in defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the status rows to the terminal instead of opening a window
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("Starting place_log");

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load_default()?,
    };
    config.apply_env();

    let client = RestClient::new(&config.backend)?;
    let probe = StatusProbe::new(Arc::new(client), config.backend.table.clone());
    let view = PresenceView::new(probe, tokio::runtime::Handle::current());

    #[cfg(feature = "ui")]
    if !cli.headless {
        // Blocks until the window closes; the view is released with it.
        match dashboard::run_dashboard(&view, &config.ui) {
            Ok(_) => info!("Dashboard closed cleanly"),
            Err(e) => eprintln!("Dashboard error: {:#?}", e),
        }
        return Ok(());
    }

    #[cfg(not(feature = "ui"))]
    if !cli.headless {
        info!("built without the 'ui' feature; rendering to the terminal");
    }

    let state = dashboard::run_headless(&view).await?;
    if let ConnectionState::Failed(_) = state {
        std::process::exit(1);
    }
    Ok(())
}
