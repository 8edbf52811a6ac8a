use crate::job::{JobId, JobStatus};
use std::path::PathBuf;
use thiserror::Error;
use tuneline_abstraction::ModelError;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("unexpected job state: {0}")]
    JobState(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("failed to read {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single source line could not be used. Logged and skipped by the assembler.
    #[error("{}:{line}: {reason}", path.display())]
    Decode { path: PathBuf, line: usize, reason: String },

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error("remote service error: {0}")]
    Transport(#[from] ModelError),

    #[error("fine-tuning job {job_id} failed: {}", diagnostics.as_deref().unwrap_or("no diagnostics reported"))]
    JobFailed { job_id: JobId, diagnostics: Option<String> },

    #[error("fine-tuning job {job_id} still {status} after {attempts} polls")]
    PollLimitExceeded { job_id: JobId, status: JobStatus, attempts: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
