//! Prepare command implementation.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use tuneline_models::fetch_dataset;
use tuneline_training::{prepare_dataset, DatasetFiles, WorkspaceLayout};

pub async fn execute(config: &AppConfig, skip_download: bool, dataset_url: Option<String>, json_output: bool) -> Result<()> {
    let layout = WorkspaceLayout::for_workspace_root(&config.workspace_root);
    let data_dir = layout.data_dir();

    if skip_download {
        tracing::info!(data_dir = %data_dir.display(), "Using existing dataset files");
    } else {
        let url = dataset_url.unwrap_or_else(|| config.dataset_url.clone());
        let client = reqwest::Client::new();
        let extracted = fetch_dataset(&client, &url, &data_dir)
            .await
            .with_context(|| format!("Failed to fetch dataset from {}", url))?;
        tracing::info!(files = extracted.len(), "Dataset downloaded");
    }

    let report = prepare_dataset(&data_dir, &DatasetFiles::default(), &layout)
        .with_context(|| format!("Failed to prepare dataset from {}", data_dir.display()))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("{}", "Dataset prepared".bold().green());
    println!("  Training:     {} ({} positive, {} negative)", report.training_path.display().to_string().cyan(), report.positives, report.negatives);
    println!("  Verification: {} ({} lines)", report.verification_path.display().to_string().cyan(), report.verification);
    println!("  Dataset id:   {}", report.dataset_id.to_string().dimmed());
    if report.skipped_lines > 0 {
        println!("  {}", format!("{} undecodable lines skipped", report.skipped_lines).yellow());
    }
    println!();
    Ok(())
}
