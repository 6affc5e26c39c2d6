use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use courier::config::{Config, DestinationConfig, LoggingConfig};
use tokio_util::sync::CancellationToken;

/// Stage DICOM files from a source directory and export them to a folder or a PACS
#[derive(Debug, Parser)]
#[command(name = "courier", version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "courier.toml")]
    config: PathBuf,

    /// Override the source directory from the config file
    #[arg(long)]
    source: Option<PathBuf>,

    /// Export to this folder instead of the configured destination
    #[arg(long)]
    dest_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the key attributes of one DICOM file
    Inspect {
        file: PathBuf,

        /// Also list every top-level tag
        #[arg(long)]
        all_tags: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Inspect { file, all_tags }) = &cli.command {
        courier::init_logging(&LoggingConfig::default())?;
        print!("{}", courier::inspect::inspect(file, *all_tags)?);
        return Ok(());
    }

    let contents = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("failed to read {}", cli.config.display()))?;
    let mut config = Config::from_toml(&contents)?;
    if let Some(source) = cli.source {
        config.source.path = source;
    }
    if let Some(path) = cli.dest_folder {
        let prefix = match &config.destination {
            DestinationConfig::Folder { prefix, .. } => prefix.clone(),
            DestinationConfig::Pacs { .. } => "export".to_string(),
        };
        config.destination = DestinationConfig::Folder { path, prefix };
    }
    config.validate()?;

    courier::init_logging(&config.logging)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current file");
            ctrl_c.cancel();
        }
    });

    let summary = courier::run(config, cancel).await?;
    tracing::info!(
        cached = summary.cache.cached,
        found = summary.cache.total,
        exported = summary.export.map(|e| e.succeeded).unwrap_or(0),
        "Transfer finished"
    );

    if summary.export.is_some_and(|e| e.failed() > 0) {
        std::process::exit(2);
    }
    Ok(())
}
