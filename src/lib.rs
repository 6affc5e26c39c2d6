pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod inspect;
pub mod pipeline;
pub mod progress;
pub mod storage;

use std::fs::File;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::{Config, LoggingConfig};
use crate::error::{Result, TransferError};
use crate::pipeline::{spawn_transfer, TransferSummary};
use crate::progress::TransferProgress;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. A second call is a no-op.
pub fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.log_level))
        .map_err(|e| TransferError::config(format!("invalid log level: {}", e)))?;

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true);

    let file_layer = if logging.log_to_file && !logging.log_file_path.is_empty() {
        let file = File::create(&logging.log_file_path)?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(Mutex::new(file)),
        )
    } else {
        None
    };

    // Already initialised, e.g. by a test harness
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}

/// Run one configured transfer to completion.
///
/// The pipeline runs on the blocking pool. Its messages reach the terminal
/// through `tracing`; the event stream only drives the progress bar.
pub async fn run(config: Config, cancel: CancellationToken) -> Result<TransferSummary> {
    tracing::info!(
        "🔧 Transferring {} -> {}",
        config.source.path.display(),
        config.destination.kind()
    );

    let (handle, mut events) = spawn_transfer(config, cancel);
    let progress = TransferProgress::detect();
    while let Some(event) = events.recv().await {
        progress.on_event(&event);
    }
    progress.finish();

    handle.await?
}
