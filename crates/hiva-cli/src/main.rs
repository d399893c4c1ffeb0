//! hiva - a command line front-end for the HIVA billing service.
//!
//! Lists and edits companies, browses the product catalog, fills the cart
//! and issues invoices, all through the billing service REST API.

mod app;
mod cli;
mod format;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use hiva_core::Config;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use cli::Cli;

/// Log file name prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "hiva.log";

/// Initialize the tracing subscriber for logging.
/// The returned guard must live until exit so buffered file logs are flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = cli.base_url {
        config.base_url = url;
    }

    let log_dir = if cli.log_file {
        Some(config.cache_dir()?.join("logs"))
    } else {
        None
    };
    let _guard = init_tracing(log_dir.as_deref());
    info!(base_url = %config.base_url, "hiva starting");

    let app = App::new(config)?;
    app.run(cli.command).await
}
