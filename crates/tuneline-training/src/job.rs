use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use tuneline_models::{FineTuningJob, RemoteJobStatus};

/// Base model fine-tuned when nothing else is configured.
pub const DEFAULT_BASE_MODEL: &str = "gpt-4o-mini-2024-07-18";

/// Identifier of a remote fine-tuning job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        })
    }
}

impl From<RemoteJobStatus> for JobStatus {
    fn from(status: RemoteJobStatus) -> Self {
        match status {
            RemoteJobStatus::ValidatingFiles | RemoteJobStatus::Queued => Self::Queued,
            // Statuses we do not know yet are treated as still in progress.
            RemoteJobStatus::Running | RemoteJobStatus::Unknown => Self::Running,
            RemoteJobStatus::Succeeded => Self::Succeeded,
            RemoteJobStatus::Failed | RemoteJobStatus::Cancelled => Self::Failed,
        }
    }
}

/// Snapshot of a remote job. Only refreshed by polling the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub trained_tokens: Option<u64>,
    #[serde(default)]
    fine_tuned_model: Option<String>,
    #[serde(default)]
    pub diagnostics: Option<String>,
}

impl JobHandle {
    #[must_use]
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: JobId(id.into()),
            status,
            trained_tokens: None,
            fine_tuned_model: None,
            diagnostics: None,
        }
    }

    #[must_use]
    pub fn with_fine_tuned_model(mut self, model: impl Into<String>) -> Self {
        self.fine_tuned_model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: impl Into<String>) -> Self {
        self.diagnostics = Some(diagnostics.into());
        self
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The trained model, exposed only once the job has succeeded.
    #[must_use]
    pub fn fine_tuned_model(&self) -> Option<&str> {
        match self.status {
            JobStatus::Succeeded => self.fine_tuned_model.as_deref(),
            _ => None,
        }
    }

    /// Converts a terminal handle into the trained model id.
    ///
    /// # Errors
    /// `JobFailed` for failed jobs, `JobState` for jobs that are not finished or
    /// succeeded without reporting a model.
    pub fn into_fine_tuned_model(self) -> TrainingResult<String> {
        match self.status {
            JobStatus::Succeeded => self.fine_tuned_model.ok_or_else(|| {
                TrainingError::JobState(format!("job {} succeeded without a fine-tuned model", self.id))
            }),
            JobStatus::Failed => Err(TrainingError::JobFailed { job_id: self.id, diagnostics: self.diagnostics }),
            status => Err(TrainingError::JobState(format!("job {} is still {status}", self.id))),
        }
    }
}

impl From<FineTuningJob> for JobHandle {
    fn from(job: FineTuningJob) -> Self {
        let status = JobStatus::from(job.status);
        let diagnostics = match (job.status, job.error) {
            (_, Some(error)) => Some(error.to_string()),
            (RemoteJobStatus::Cancelled, None) => Some("job was cancelled".to_string()),
            _ => None,
        };

        Self {
            id: JobId(job.id),
            status,
            trained_tokens: job.trained_tokens,
            fine_tuned_model: job.fine_tuned_model,
            diagnostics,
        }
    }
}
