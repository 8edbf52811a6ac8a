use crate::job::{JobId, JobStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Submitted { job_id: JobId, training_file: String },
    Status { job_id: JobId, status: JobStatus, trained_tokens: Option<u64>, attempt: u32 },
    Succeeded { job_id: JobId, fine_tuned_model: Option<String> },
    Failed { job_id: JobId, diagnostics: Option<String> },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

#[derive(Debug, Default)]
pub struct StdoutProgressSink;

impl ProgressSink for StdoutProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Submitted { job_id, training_file } => {
                println!("[finetune:{job_id}] submitted (training file {training_file})");
            }
            ProgressEvent::Status { job_id, status, trained_tokens, attempt } => {
                if let Some(tokens) = trained_tokens {
                    println!("[finetune:{job_id}] poll {attempt}: {status}, trained tokens {tokens}");
                } else {
                    println!("[finetune:{job_id}] poll {attempt}: {status}");
                }
            }
            ProgressEvent::Succeeded { job_id, fine_tuned_model } => {
                println!(
                    "[finetune:{job_id}] succeeded, model {}",
                    fine_tuned_model.as_deref().unwrap_or("<not reported>")
                );
            }
            ProgressEvent::Failed { job_id, diagnostics } => {
                println!("[finetune:{job_id}] failed");
                if let Some(diagnostics) = diagnostics {
                    println!("[finetune:{job_id}] error: {diagnostics}");
                }
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_event(&self, _event: ProgressEvent) {}
}
