//! Grading endpoint client.
//!
//! Submits the positional answer for the `research` task and returns the
//! endpoint's JSON verdict.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use tuneline_abstraction::ModelError;

/// Default report endpoint.
pub const DEFAULT_REPORT_URL: &str = "https://c3ntrala.ag3nts.org/report";

/// Task tag the grading endpoint expects for this pipeline.
pub const REPORT_TASK: &str = "research";

/// Body of a report submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub task: String,
    pub apikey: String,
    pub answer: Vec<String>,
}

impl AnswerPayload {
    #[must_use]
    pub fn new(apikey: String, answer: Vec<String>) -> Self {
        Self { task: REPORT_TASK.to_string(), apikey, answer }
    }

    /// Same payload with the key masked, for logs and dry runs.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self { apikey: "***".to_string(), ..self.clone() }
    }
}

/// Client for the grading endpoint.
#[derive(Debug, Clone)]
pub struct GradingClient {
    url: String,
    api_key: String,
    http_client: Client,
}

impl GradingClient {
    #[must_use]
    pub fn new(url: String, api_key: String) -> Self {
        Self { url, api_key, http_client: Client::new() }
    }

    #[must_use]
    pub fn payload(&self, answer: Vec<String>) -> AnswerPayload {
        AnswerPayload::new(self.api_key.clone(), answer)
    }

    /// Posts the answer. Any non-2xx status is an error carrying the response body.
    ///
    /// # Errors
    /// Returns `ModelError::RequestError` on transport failure and
    /// `ModelError::ModelResponseError` on a non-success status or non-JSON body.
    pub async fn submit(&self, answer: Vec<String>) -> Result<serde_json::Value, ModelError> {
        let payload = self.payload(answer);
        debug!(url = %self.url, answer = ?payload.answer, "Submitting report");

        let response = self
            .http_client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send report");
                ModelError::RequestError(format!("Failed to send report: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            error!(status = %status, body = %body, "Report endpoint returned error status");
            return Err(ModelError::ModelResponseError(format!("report rejected ({status}): {body}")));
        }

        let verdict: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            ModelError::ModelResponseError(format!("report response is not JSON ({e}): {body}"))
        })?;

        info!(response = %verdict, "Report accepted");
        Ok(verdict)
    }
}
