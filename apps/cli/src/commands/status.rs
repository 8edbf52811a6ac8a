//! Status command implementation.

use super::finetune::backend;
use crate::config::AppConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use tuneline_training::{discover_runs, write_manifest, FineTuningBackend, JobId, JobStatus, WorkspaceLayout};

pub async fn execute(config: &AppConfig, job_id: &str, json_output: bool) -> Result<()> {
    let backend = backend(config)?;
    let job_id = JobId(job_id.to_string());

    let handle = backend
        .poll(&job_id)
        .await
        .with_context(|| format!("Failed to retrieve fine-tuning job {}", job_id))?;

    // Keep the local record in step with the service.
    let layout = WorkspaceLayout::for_workspace_root(&config.workspace_root);
    if let Some(mut manifest) = discover_runs(&layout)?.into_iter().find(|m| m.job_id == job_id) {
        manifest.update_from(&handle);
        write_manifest(&layout, &manifest).context("Failed to record run")?;
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&handle)?);
        return Ok(());
    }

    let status = match handle.status {
        JobStatus::Succeeded => handle.status.to_string().green(),
        JobStatus::Failed => handle.status.to_string().red(),
        JobStatus::Queued | JobStatus::Running => handle.status.to_string().yellow(),
    };

    println!();
    println!("  Job:    {}", handle.id.to_string().cyan());
    println!("  Status: {}", status);
    if let Some(tokens) = handle.trained_tokens {
        println!("  Tokens: {}", tokens);
    }
    if let Some(model) = handle.fine_tuned_model() {
        println!("  Model:  {}", model.cyan());
    }
    if let Some(diagnostics) = &handle.diagnostics {
        println!("  Error:  {}", diagnostics.red());
    }
    println!();
    Ok(())
}
