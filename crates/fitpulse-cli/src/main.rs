//! fitpulse - command-line front end for the fitpulse session manager.
//!
//! Restores any saved session on start-up, then signs in, signs up, signs
//! out, or reports the current session.

mod cli;
mod commands;
mod prompt;

use std::io;
use std::path::Path;

use anyhow::{anyhow, Result};
use clap::Parser;
use fitpulse_core::{AuthState, Config, SessionManager};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the log file when dropped.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow!("Invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(dir)?;

            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref())?;
    info!("fitpulse starting");

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    config.apply_env();
    if let Some(url) = cli.api_url.clone() {
        config.api_base_url = url;
    }

    let manager = SessionManager::from_config(&config)?;

    let _subscription = manager.subscribe(|snapshot| {
        debug!(state = ?snapshot.state(), "Session state changed");
        if *snapshot.state() == AuthState::Authenticating {
            eprintln!("Authenticating...");
        }
    });

    manager.restore_session().await;

    commands::run(cli.command, &manager, &mut config).await
}
