//! Fine-tune command implementation.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use std::time::Duration;
use tuneline_models::OpenAIFineTuningClient;
use tuneline_training::{
    dataset_id_for_file, write_manifest, FineTuningBackend, JobMonitor, NullProgressSink, OpenAIFineTuner, PollPolicy,
    ProgressEvent, ProgressSink, RunManifest, StdoutProgressSink, TokioSleeper, WorkspaceLayout,
};

#[derive(Debug, Clone, Default)]
pub struct FinetuneOptions {
    pub base_model: Option<String>,
    pub interval_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub no_wait: bool,
    pub json: bool,
}

/// The OpenAI fine-tuning backend for the configured key and base URL.
pub fn backend(config: &AppConfig) -> Result<OpenAIFineTuner> {
    let api_key = config.openai_api_key()?;
    let client = OpenAIFineTuningClient::with_base_url(api_key.to_string(), config.openai_base_url.clone());
    Ok(OpenAIFineTuner::new(client))
}

pub async fn execute(config: &AppConfig, options: FinetuneOptions) -> Result<()> {
    let backend = backend(config)?;
    let layout = WorkspaceLayout::for_workspace_root(&config.workspace_root);
    let training_path = layout.training_jsonl_path();
    let base_model = options.base_model.unwrap_or_else(|| config.base_model.clone());

    let dataset_id = dataset_id_for_file(&training_path)?;

    let sink: Box<dyn ProgressSink> =
        if options.json { Box::new(NullProgressSink) } else { Box::new(StdoutProgressSink) };

    let (file_id, handle) = backend
        .submit(&training_path, &base_model)
        .await
        .context("Failed to start fine-tuning job")?;
    sink.on_event(ProgressEvent::Submitted { job_id: handle.id.clone(), training_file: file_id.clone() });

    let mut manifest = RunManifest::new(&handle, backend.id(), &base_model, &file_id, &training_path, dataset_id);
    write_manifest(&layout, &manifest).context("Failed to record run")?;

    if options.no_wait {
        if options.json {
            println!("{}", serde_json::to_string_pretty(&manifest)?);
        } else {
            println!();
            println!("{}", "Fine-tuning job created".bold().green());
            println!("  Job:    {}", handle.id.to_string().cyan());
            println!("  Status: {}", handle.status);
            println!("  Check:  {}", format!("tuneline status {}", handle.id).dimmed());
            println!();
        }
        return Ok(());
    }

    let policy = PollPolicy {
        interval: options.interval_secs.map_or(config.poll_interval, Duration::from_secs),
        max_attempts: options.max_attempts,
    };
    let monitor = JobMonitor::new(&backend, &TokioSleeper, &*sink, policy);
    let last = monitor.wait(handle).await?;

    manifest.update_from(&last);
    write_manifest(&layout, &manifest).context("Failed to record run")?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
    }

    let model = last.into_fine_tuned_model()?;

    if !options.json {
        println!();
        println!("{}", "Fine-tuning complete".bold().green());
        println!("  Model: {}", model.cyan());
        println!("  Use:   {}", "tuneline report".dimmed());
        println!();
    }
    Ok(())
}
