//! tuneline CLI - fine-tune a chat model into a binary classifier
//!
//! This CLI provides a `tuneline` command that downloads and assembles the
//! labeled dataset, runs a remote fine-tuning job, and reports the positions
//! the trained model marks as positive.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{finetune, prepare, report, runs, status};
use config::AppConfig;

/// tuneline - dataset preparation, fine-tuning and reporting
#[derive(Parser, Debug)]
#[command(
    name = "tuneline",
    author,
    version,
    about = "Fine-tune a chat model on labeled lines and report its verdicts",
    long_about = "tuneline turns two labeled text files into a chat fine-tuning dataset, trains a model on it\nthrough the OpenAI fine-tuning API, and submits the verification lines the model accepts."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Configuration file (defaults to the nearest .tuneline.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Workspace directory holding data/, the JSONL streams and recorded runs
    #[arg(short = 'w', long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the dataset and write training.jsonl and verify.jsonl
    Prepare {
        /// Use the files already in data/ instead of downloading
        #[arg(long)]
        skip_download: bool,

        /// Dataset archive URL (overrides config)
        #[arg(long)]
        dataset_url: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload training.jsonl, start a fine-tuning job and wait for it
    Finetune {
        /// Base model to fine-tune (overrides config)
        #[arg(long)]
        base_model: Option<String>,

        /// Seconds between two status polls (overrides config)
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Stop waiting after this many polls
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Return right after the job is created
        #[arg(long)]
        no_wait: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the current state of a fine-tuning job
    Status {
        /// Job id as returned by `finetune`
        job_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify verify.jsonl and submit the positive line numbers
    Report {
        /// Fine-tuned model id (defaults to config, then the latest successful run)
        #[arg(long)]
        model: Option<String>,

        /// Requests kept in flight at once (overrides config)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Print the payload instead of submitting it
        #[arg(long)]
        dry_run: bool,
    },

    /// List recorded fine-tuning runs
    Runs {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = AppConfig::load(args.config.as_deref())?.with_workspace(args.workspace);

    match args.command {
        Command::Prepare { skip_download, dataset_url, json } => {
            prepare::execute(&config, skip_download, dataset_url, json).await?;
        }
        Command::Finetune { base_model, interval_secs, max_attempts, no_wait, json } => {
            let options = finetune::FinetuneOptions { base_model, interval_secs, max_attempts, no_wait, json };
            finetune::execute(&config, options).await?;
        }
        Command::Status { job_id, json } => {
            status::execute(&config, &job_id, json).await?;
        }
        Command::Report { model, concurrency, dry_run } => {
            report::execute(&config, model, concurrency, dry_run).await?;
        }
        Command::Runs { json } => {
            runs::execute(&config, json)?;
        }
    }

    Ok(())
}
