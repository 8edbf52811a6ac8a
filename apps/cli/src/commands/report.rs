//! Report command implementation.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use tuneline_models::{AnswerPayload, GradingClient, OpenAIModel};
use tuneline_training::{
    classify_all, format_answer, latest_fine_tuned_model, read_verification_jsonl, InferenceOptions, WorkspaceLayout,
};

/// `--model`, then the configured model, then the latest successful run.
fn resolve_model(config: &AppConfig, layout: &WorkspaceLayout, flag: Option<String>) -> Result<String> {
    if let Some(model) = flag.or_else(|| config.model.clone()) {
        return Ok(model);
    }
    latest_fine_tuned_model(layout)
        .context("Failed to read recorded runs")?
        .context("No fine-tuned model available: pass --model, set TUNELINE_MODEL, or run `tuneline finetune`")
}

pub async fn execute(config: &AppConfig, model: Option<String>, concurrency: Option<usize>, dry_run: bool) -> Result<()> {
    let layout = WorkspaceLayout::for_workspace_root(&config.workspace_root);
    let model_id = resolve_model(config, &layout, model)?;
    let api_key = config.openai_api_key()?;
    // Grading key is checked before any inference request.
    let grading = if dry_run {
        None
    } else {
        Some(GradingClient::new(config.report_url.clone(), config.report_api_key()?.to_string()))
    };

    let verification_path = layout.verification_jsonl_path();
    let records = read_verification_jsonl(&verification_path)
        .with_context(|| format!("Failed to read {} (run `tuneline prepare` first)", verification_path.display()))?;

    let model = OpenAIModel::with_base_url(model_id, api_key.to_string(), config.openai_base_url.clone());
    let options = InferenceOptions { concurrency: concurrency.unwrap_or(config.concurrency) };
    let results = classify_all(&model, &records, options).await;
    if results.skipped() > 0 {
        tracing::warn!(skipped = results.skipped(), "Some lines had no usable answer and were left out");
    }

    let answer = format_answer(&results);

    let Some(grading) = grading else {
        let key = config.report_api_key.clone().unwrap_or_default();
        let payload = AnswerPayload::new(key, answer).redacted();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    };

    let verdict = grading.submit(answer.clone()).await.context("Failed to submit report")?;

    println!();
    println!("{}", "Report submitted".bold().green());
    println!("  Answer:   {}", answer.join(", ").cyan());
    println!("  Response: {}", serde_json::to_string_pretty(&verdict)?);
    println!();
    Ok(())
}
