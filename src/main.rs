//! Taskdeck
//!
//! A personal task board: tasks with cover images, rendered server-side,
//! plus a WebSocket channel that opens project folders in a local terminal.

use anyhow::Result;
use clap::Parser;
use std::fs::OpenOptions;
use std::sync::Mutex;
use taskdeck::cli::Cli;
use taskdeck::config::Config;
use taskdeck::db::Database;
use taskdeck::service::{TaskService, UploadStore};
use taskdeck::web::{self, AppState, templates::Templates};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install the global tracing subscriber selected by `--log`.
///
/// `RUST_LOG` takes precedence over `--verbose` when set.
fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let mut config = Config::resolve(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.ensure_dirs()?;

    info!(db = %config.server.db_path.display(), "Opening database");
    let db = Database::open(&config.server.db_path)?;

    let uploads = UploadStore::new(config.storage.covers_dir())
        .with_max_width(config.storage.max_cover_width);
    let service = TaskService::new(db, uploads);

    let state = AppState::new(service, Templates::embedded(), config.storage.uploads_root())
        .with_max_upload_bytes(config.storage.max_upload_bytes);

    let (shutdown_tx, bound_addr, server) = web::start_server(state, &config.bind_addr()).await?;
    info!("Open http://{} in a browser", bound_addr);

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received");
    let _ = shutdown_tx.send(());
    server.await?;

    Ok(())
}
