use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqs2s3_config::{DispatchMode, RuntimeConfig};
use std::path::PathBuf;
use tracing::{error, info};

/// Store SQS messages as JSON objects and maintain an HTML index
#[derive(Parser)]
#[command(name = "sqs2s3")]
#[command(version)]
#[command(about = "Replay SQS batches into object storage and rebuild the message index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a captured SQS event file through the batch dispatcher
    Replay {
        /// JSON file holding `{"Records": [...]}`
        #[arg(value_name = "EVENT_FILE")]
        event: PathBuf,

        /// Dispatch mode: fail-fast or best-effort (overrides config)
        #[arg(short, long, value_name = "MODE")]
        mode: Option<String>,
    },
    /// Regenerate index.html from the stored messages
    RebuildIndex,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => RuntimeConfig::load().context("Failed to load configuration")?,
    };

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    sqs2s3::init_tracing(&config.logging);

    match cli.command {
        Commands::Replay { event, mode } => {
            let mode = mode
                .map(|m| m.parse::<DispatchMode>())
                .transpose()
                .context("Invalid --mode")?;

            match sqs2s3::replay(&config, &event, mode).await {
                Ok(report) => {
                    info!(processed = report.processed, "{}", report.summary());
                    Ok(())
                }
                Err(e) => {
                    error!("Replay failed: {:#}", e);
                    Err(e)
                }
            }
        }
        Commands::RebuildIndex => {
            let store = sqs2s3::init_store(&config)?;
            let report = sqs2s3::rebuild_index(store).await?;
            info!(
                "Wrote index.html listing {} messages to {} storage",
                report.entries, config.storage.backend
            );
            Ok(())
        }
    }
}
