//! OpenAI Files + Fine-tuning Jobs client.
//!
//! Upload a JSONL training file, create a fine-tuning job from it, and retrieve
//! the job's current state. Every call is a single request; retries are left to
//! the caller.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use tuneline_abstraction::ModelError;

use crate::map_http_error;
use crate::openai::DEFAULT_OPENAI_BASE_URL;

/// Job status as reported by the fine-tuning API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteJobStatus {
    ValidatingFiles,
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// Error payload attached to a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FineTuningJobError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
}

impl std::fmt::Display for FineTuningJobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, "{code}: {message}"),
            (None, Some(message)) => f.write_str(message),
            (Some(code), None) => f.write_str(code),
            (None, None) => f.write_str("no details"),
        }
    }
}

/// A fine-tuning job as returned by create/retrieve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FineTuningJob {
    pub id: String,
    pub status: RemoteJobStatus,
    /// Base model the job trains from.
    #[serde(default)]
    pub model: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub fine_tuned_model: Option<String>,
    #[serde(default)]
    pub trained_tokens: Option<u64>,
    #[serde(default)]
    pub training_file: Option<String>,
    #[serde(default)]
    pub error: Option<FineTuningJobError>,
}

/// An uploaded file reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub purpose: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateJobRequest<'a> {
    training_file: &'a str,
    model: &'a str,
}

/// Client for the OpenAI files and fine-tuning endpoints.
#[derive(Debug, Clone)]
pub struct OpenAIFineTuningClient {
    /// API key for authentication.
    api_key: String,
    /// Base URL (e.g. `https://api.openai.com/v1`).
    base_url: String,
    /// HTTP client for making requests.
    http_client: Client,
}

impl OpenAIFineTuningClient {
    #[must_use]
    pub fn with_api_key(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_OPENAI_BASE_URL.to_string())
    }

    #[must_use]
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: Client::new(),
        }
    }

    /// Uploads a JSONL file with purpose `fine-tune`.
    ///
    /// # Errors
    /// Returns `ModelError` if the file cannot be read or the upload fails.
    pub async fn upload_file(&self, file_path: &Path) -> Result<UploadedFile, ModelError> {
        debug!(path = %file_path.display(), "Uploading training file");

        let file_bytes = tokio::fs::read(file_path).await.map_err(|e| {
            ModelError::RequestError(format!("Failed to read {}: {}", file_path.display(), e))
        })?;

        let file_name = file_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("training.jsonl")
            .to_string();

        let part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str("application/jsonl")
            .map_err(|e| ModelError::RequestError(format!("Failed to set MIME type: {}", e)))?;
        let form = Form::new().text("purpose", "fine-tune").part("file", part);

        let response = self
            .http_client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ModelError::RequestError(format!("Failed to upload file: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_http_error("openai", status, &error_text, "file upload"));
        }

        let file: UploadedFile = response.json().await.map_err(|e| {
            ModelError::SerializationError(format!("Failed to parse upload response: {}", e))
        })?;

        info!(file_id = %file.id, "Training file uploaded");
        Ok(file)
    }

    /// Creates a fine-tuning job for an uploaded file.
    ///
    /// # Errors
    /// Returns `ModelError` on transport or API failure.
    pub async fn create_job(&self, training_file: &str, model: &str) -> Result<FineTuningJob, ModelError> {
        debug!(training_file, model, "Creating fine-tuning job");

        let response = self
            .http_client
            .post(format!("{}/fine_tuning/jobs", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&CreateJobRequest { training_file, model })
            .send()
            .await
            .map_err(|e| ModelError::RequestError(format!("Failed to create job: {}", e)))?;

        let job = Self::parse_job(response, "job create").await?;
        info!(job_id = %job.id, status = ?job.status, "Fine-tuning job created");
        Ok(job)
    }

    /// Fetches the current state of a job. Read-only.
    ///
    /// # Errors
    /// Returns `ModelError` on transport or API failure.
    pub async fn retrieve_job(&self, job_id: &str) -> Result<FineTuningJob, ModelError> {
        let response = self
            .http_client
            .get(format!("{}/fine_tuning/jobs/{}", self.base_url, job_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ModelError::RequestError(format!("Failed to retrieve job: {}", e)))?;

        let job = Self::parse_job(response, "job retrieve").await?;
        debug!(job_id = %job.id, status = ?job.status, trained_tokens = ?job.trained_tokens, "Fine-tuning job retrieved");
        Ok(job)
    }

    async fn parse_job(response: reqwest::Response, operation: &str) -> Result<FineTuningJob, ModelError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_http_error("openai", status, &error_text, operation));
        }

        response.json().await.map_err(|e| {
            ModelError::SerializationError(format!("Failed to parse {} response: {}", operation, e))
        })
    }
}
