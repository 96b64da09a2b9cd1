//! prizedraw-daemon - serves the draw UI API and offers operator commands.
//!
//! # Usage
//!
//! ```bash
//! prizedraw-daemon --config prizedraw.toml              # serve (default)
//! prizedraw-daemon --listen 0.0.0.0:8000 serve
//! prizedraw-daemon status                                # print prize status
//! prizedraw-daemon winners                               # print winner records
//! prizedraw-daemon reset                                 # restore initial state
//! ```
//!
//! Command-line flags override the matching `[server]` settings from the
//! configuration file. A missing configuration file means defaults.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prizedraw_core::allocator::PrizeStatus;
use prizedraw_core::config::AppConfig;
use prizedraw_core::engine::DrawEngine;
use prizedraw_core::roster::{JsonRosterProvider, RosterProvider};
use prizedraw_core::store::{SqliteStateStore, StateStore};
use prizedraw_daemon::{AppState, router};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// prizedraw daemon - tiered prize draw server
#[derive(Parser, Debug)]
#[command(name = "prizedraw-daemon")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "prizedraw.toml")]
    config: PathBuf,

    /// HTTP listen address
    #[arg(long)]
    listen: Option<String>,

    /// Path to draw state database (`SQLite`)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Path to participant roster JSON
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log to file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Serve the HTTP API until Ctrl-C
    Serve,
    /// Print current tier and remaining counts as JSON
    Status,
    /// Print winner records as JSON
    Winners,
    /// Clear winners, absences and the draw counter
    Reset,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = load_config(&args)?;
    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let runtime =
                tokio::runtime::Runtime::new().context("failed to create Tokio runtime")?;
            runtime.block_on(serve(config))
        },
        Command::Status => {
            let store = open_store(&config)?;
            let tiers = store
                .read_tier_status()
                .context("failed to read tier status")?;
            print_json(&PrizeStatus::from_tiers(&tiers))
        },
        Command::Winners => {
            let store = open_store(&config)?;
            let winners = store.read_winners().context("failed to read winners")?;
            print_json(&winners)
        },
        Command::Reset => {
            let store = open_store(&config)?;
            store.reset().context("failed to reset draw state")?;
            println!("Draw reset successfully");
            Ok(())
        },
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(log_file) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .context("failed to open log file")?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        // stdout is reserved for command output.
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

/// Loads the configuration file and applies command-line overrides.
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::from_file_or_default(&args.config)
        .with_context(|| format!("failed to load configuration {}", args.config.display()))?;

    if let Some(listen) = &args.listen {
        config.server.listen_addr.clone_from(listen);
    }
    if let Some(database) = &args.database {
        config.server.database_path.clone_from(database);
    }
    if let Some(roster) = &args.roster {
        config.server.roster_path.clone_from(roster);
    }
    Ok(config)
}

fn open_store(config: &AppConfig) -> Result<SqliteStateStore> {
    SqliteStateStore::open(&config.server.database_path, &config.draw.tiers.table())
        .with_context(|| {
            format!(
                "failed to open draw database {}",
                config.server.database_path.display()
            )
        })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{json}");
    Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
    let roster = JsonRosterProvider::new(&config.server.roster_path, &config.server.photo_dir)
        .load_roster()
        .context("failed to load participant roster")?;
    let store = open_store(&config)?;
    let engine = DrawEngine::new(store, roster, config.draw.override_rule.rule());
    info!(
        participants = engine.roster().len(),
        database = %config.server.database_path.display(),
        "Draw engine ready"
    );

    let state = AppState::new(engine, config.server.suspense_delay_ms);
    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen_addr))?;
    info!(addr = %config.server.listen_addr, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
