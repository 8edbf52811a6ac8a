//! Runs command implementation.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use tuneline_training::{discover_runs, JobStatus, WorkspaceLayout};

pub fn execute(config: &AppConfig, json_output: bool) -> Result<()> {
    let layout = WorkspaceLayout::for_workspace_root(&config.workspace_root);
    let runs = discover_runs(&layout).context("Failed to read recorded runs")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Fine-tuning Runs ({})", runs.len()).bold().cyan());
    println!();

    if runs.is_empty() {
        println!("  {}", "No runs recorded for this workspace.".dimmed());
        println!();
        println!("  {}", "Tip: run `tuneline prepare` then `tuneline finetune`.".dimmed());
        return Ok(());
    }

    println!("{:<32} {:<10} {:<20} {}", "Job", "Status", "Created", "Model");
    println!("{}", "─".repeat(100));
    for run in runs {
        let status = match run.status {
            JobStatus::Succeeded => run.status.to_string().green(),
            JobStatus::Failed => run.status.to_string().red(),
            JobStatus::Queued | JobStatus::Running => run.status.to_string().yellow(),
        };
        println!(
            "{:<32} {:<10} {:<20} {}",
            run.job_id.to_string().cyan(),
            status,
            run.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            run.fine_tuned_model.as_deref().unwrap_or("-")
        );
    }
    println!();
    Ok(())
}
