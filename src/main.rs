// hive - supervise many coding agents from one terminal
//
// Architecture:
// - Controller (tui::app): one state machine folding every event into UI
//   and session state, returning background tasks to run
// - Event loop (tui): terminal input, timers and task results feed the
//   controller; ratatui draws the result
// - Backend (session): agent processes and working copies behind traits;
//   the built-in demo backend simulates them in memory
// - Brain gateway (brain): agents ask the controller to create, message,
//   pause, resume and kill their siblings
// - Storage: sessions, topics and repository history as JSON files

mod brain;
mod cli;
mod config;
mod demo;
mod logging;
mod session;
mod storage;
mod tui;
mod util;

use anyhow::{Context, Result};
use config::{Config, LogRotation};
use logging::{LogBuffer, TuiLogLayer};
use std::path::PathBuf;
use std::sync::Arc;
use storage::JsonStore;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Route logs to the TUI buffer, plus a rolling JSON file when enabled.
///
/// Nothing goes to stdout: it would garble the alternate screen. The
/// returned guard must live until exit so the file writer flushes.
fn init_tracing(config: &Config, log_buffer: &LogBuffer) -> Option<WorkerGuard> {
    // Precedence: RUST_LOG env var > config file > default "info"
    let default_filter = format!("hive={}", config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let logging = &config.logging;
    if logging.file_enabled {
        if let Err(e) = std::fs::create_dir_all(&logging.file_dir) {
            eprintln!(
                "Warning: Could not create log directory {:?}: {}",
                logging.file_dir, e
            );
        } else {
            let file_appender = match logging.file_rotation {
                LogRotation::Hourly => {
                    tracing_appender::rolling::hourly(&logging.file_dir, &logging.file_prefix)
                }
                LogRotation::Daily => {
                    tracing_appender::rolling::daily(&logging.file_dir, &logging.file_prefix)
                }
                LogRotation::Never => {
                    tracing_appender::rolling::never(&logging.file_dir, &logging.file_prefix)
                }
            };

            // Writes happen on a background thread
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(TuiLogLayer::new(log_buffer.clone()))
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking)
                        .with_ansi(false),
                )
                .init();
            return Some(guard);
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(TuiLogLayer::new(log_buffer.clone()))
        .init();
    None
}

/// Repositories named on the command line, or the working directory
fn active_repos(requested: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if requested.is_empty() {
        let cwd = std::env::current_dir().context("Failed to read the working directory")?;
        return Ok(vec![cwd]);
    }
    requested
        .iter()
        .map(|path| {
            let path = util::expand_home(&path.to_string_lossy());
            path.canonicalize()
                .with_context(|| format!("Repository {} does not exist", path.display()))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle CLI commands first (config --show, --reset, --edit, --update)
    let Some(args) = cli::handle_cli() else {
        return Ok(());
    };

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();
    let mut config = Config::from_env();
    args.apply(&mut config);

    let log_buffer = LogBuffer::new();
    let _file_guard = init_tracing(&config, &log_buffer);

    let repos = active_repos(&args.repos)?;
    let store = JsonStore::new(config.data_dir.clone())?;
    let backend = Arc::new(demo::DemoBackend::new(
        config.branch_prefix.clone(),
        config.data_dir.clone(),
    ));

    tracing::info!(
        "hive {} starting with {} ({} repositories)",
        config::VERSION,
        config.default_program,
        repos.len()
    );

    let cancel = CancellationToken::new();
    let (sender, intake) = brain::channel();
    demo::spawn_brain(sender, cancel.clone());

    let app = tui::app::App::new(
        config,
        backend,
        Box::new(store),
        log_buffer,
        cancel.clone(),
        repos,
    )?;

    tui::run_tui(app, intake, cancel).await
}
