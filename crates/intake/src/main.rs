//! # Intake - Clinic Referral Service
//!
//! Accepts web-submitted referral forms, renders each into a PDF, and
//! dispatches it to a fixed mailing list over SMTP. A background poller
//! republishes a mailbox-sourced "message of the day" fragment for the
//! frontend.
//!
//! ## Architecture
//! ```text
//! Browser → intake → SMTP relay (referral dispatch)
//!              ↓
//!        IMAP mailbox → motd.html (bulletin poller)
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod bulletin;
mod captcha;
mod config;
mod document;
mod mailer;
mod routes;
mod sequence;
mod state;

use bulletin::{BulletinPublisher, CurlFetcher};
use config::{AppConfig, read_list_file};
use state::AppState;

/// Clinic referral intake service
#[derive(Parser, Debug)]
#[command(name = "intake")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/intake.toml")]
    config: String,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("🏥 Starting clinic intake v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    // Both list files are required for startup
    let mailing_list = read_list_file(&config.referral.mailing_list_path)?;
    let authorized_senders = read_list_file(&config.bulletin.authorized_senders_path)?;
    info!(
        recipients = mailing_list.len(),
        authorized_senders = authorized_senders.len(),
        "Recipient lists loaded"
    );

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Initialize application state
    let state = AppState::new(config.clone(), mailing_list)?;

    // Spawn the expired-challenge sweeper
    tokio::spawn(captcha::sweep_worker(
        state.captcha.clone(),
        shutdown_tx.subscribe(),
    ));

    // Spawn the bulletin poller
    let publisher = BulletinPublisher::new(
        Path::new(&config.bulletin.template_path),
        Path::new(&config.bulletin.assets_path).join(&config.bulletin.output_file),
    )?;
    let fetcher = CurlFetcher::new(&config.bulletin);
    tokio::spawn(bulletin::bulletin_worker(
        fetcher,
        publisher,
        authorized_senders,
        Duration::from_secs(config.bulletin.poll_interval_secs),
        shutdown_tx.subscribe(),
    ));

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("🚀 intake listening on {}", config.listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("🛑 Shutdown signal received");
        let _ = shutdown_tx.send(());
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("👋 intake shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
