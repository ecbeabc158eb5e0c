//! Drainflow CLI
//!
//! Command-line front end for the Drain template mining engine.

use anyhow::Result;
use clap::{Parser, Subcommand};
use drainflow_core::DrainConfig;
use drainflow_miner::{MinerConfig, TemplateMiner};
use drainflow_persistence::FilePersistence;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "drainflow")]
#[command(about = "Online log template mining with the Drain algorithm", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine templates from a log file and print every cluster
    Mine {
        /// Log file to mine, one message per line
        #[arg(short, long)]
        file: PathBuf,

        /// Snapshot file; engine state is restored from and saved to it
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Extra delimiters rewritten to spaces before splitting
        #[arg(short, long)]
        delimiter: Vec<String>,

        /// Log level
        #[arg(short, long, default_value = "info")]
        log_level: String,
    },

    /// Mine templates from a log file and dump the prefix tree
    Tree {
        /// Log file to mine, one message per line
        #[arg(short, long)]
        file: PathBuf,

        /// Extra delimiters rewritten to spaces before splitting
        #[arg(short, long)]
        delimiter: Vec<String>,

        /// Clusters shown per tree leaf
        #[arg(short, long, default_value_t = 5)]
        max_clusters: usize,

        /// Log level
        #[arg(short, long, default_value = "info")]
        log_level: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Mine {
            file,
            state,
            delimiter,
            log_level,
        } => {
            setup_logging(&log_level)?;
            mine(file, state, delimiter).await?;
        }
        Commands::Tree {
            file,
            delimiter,
            max_clusters,
            log_level,
        } => {
            setup_logging(&log_level)?;
            tree(file, delimiter, max_clusters).await?;
        }
    }

    Ok(())
}

fn setup_logging(level: &str) -> Result<()> {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(())
}

fn miner_for(state: Option<PathBuf>, delimiters: Vec<String>) -> Result<TemplateMiner> {
    let config = MinerConfig {
        drain: DrainConfig {
            extra_delimiters: delimiters,
            ..DrainConfig::default()
        },
        ..MinerConfig::default()
    };

    let miner = match state {
        Some(path) => {
            TemplateMiner::with_persistence(config, Arc::new(FilePersistence::new(path)))?
        }
        None => TemplateMiner::new(config)?,
    };
    Ok(miner)
}

async fn mine_file(miner: &mut TemplateMiner, file: &PathBuf) -> Result<u64> {
    let file = tokio::fs::File::open(file).await?;
    let mut lines = tokio::io::BufReader::new(file).lines();

    let mut total = 0u64;
    while let Some(line) = lines.next_line().await? {
        miner.add_log_message(&line).await?;
        total += 1;
    }
    Ok(total)
}

async fn mine(file: PathBuf, state: Option<PathBuf>, delimiters: Vec<String>) -> Result<()> {
    let mut miner = miner_for(state, delimiters)?;
    if miner.load_state().await? {
        info!(clusters = miner.clusters().len(), "resuming from snapshot");
    }

    let total = mine_file(&mut miner, &file).await?;
    miner.save_state().await?;

    info!(lines = total, clusters = miner.clusters().len(), "mining finished");
    for cluster in miner.clusters() {
        println!("{cluster}");
    }

    Ok(())
}

async fn tree(file: PathBuf, delimiters: Vec<String>, max_clusters: usize) -> Result<()> {
    let mut miner = miner_for(None, delimiters)?;
    let total = mine_file(&mut miner, &file).await?;

    info!(lines = total, clusters = miner.clusters().len(), "mining finished");
    miner.drain().print_tree(max_clusters);

    Ok(())
}
