//! ROI Annotator server binary

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use roi_annotator::config::{self, AppConfig};
use roi_annotator::state::AppState;
use roi_annotator::web_api;

/// ROI Annotator - live region text detection with annotated replay video
#[derive(Parser, Debug)]
#[command(name = "roi-annotator")]
#[command(about = "Session-scoped frame annotation server")]
struct Args {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides server.bind_addr
    #[arg(short, long)]
    bind: Option<String>,

    /// Session output directory, overrides storage.output_dir
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(config::default_config_path);
    let mut config = load_or_default(config_path.as_ref())?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    if let Some(output_dir) = args.output_dir {
        config.storage.output_dir = output_dir;
    }

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    if args.init_config {
        let path = config_path.context("no config path available on this platform")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        config::save_config(&config, &path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    // Initialize logging; RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("ROI Annotator v{} starting...", env!("CARGO_PKG_VERSION"));

    std::fs::create_dir_all(&config.storage.output_dir).with_context(|| {
        format!("creating output directory {}", config.storage.output_dir.display())
    })?;
    info!(output_dir = %config.storage.output_dir.display(), "Session output directory ready");

    let bind_addr = config.server.bind_addr.clone();
    let state = AppState::from_config(config);
    let registry = state.registry.clone();
    let app = web_api::build_app(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Finalize videos and persist timelines of sessions still running
    let stopped = tokio::task::spawn_blocking(move || registry.stop_all()).await?;
    info!(stopped, "ROI Annotator shutdown complete");

    Ok(())
}

/// Load configuration from file, or defaults when there is none
fn load_or_default(path: Option<&PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) if path.exists() => {
            let config = config::load_config(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?;
            eprintln!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        _ => Ok(AppConfig::default()),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
