//! Remote service clients for tuneline.
//!
//! This crate provides the HTTP side of the pipeline.
//!
//! # Services
//!
//! - **OpenAI chat completions**: the `Model` implementation used for inference
//! - **OpenAI files + fine-tuning jobs**: upload a training file, create and poll jobs
//! - **Grading endpoint**: submit the positional answer payload
//! - **Dataset archive**: download and extract the labeled corpus
//! - **Mock**: a scripted `Model` for tests and dry runs

pub mod dataset_archive;
pub mod fine_tuning;
pub mod grading;
pub mod openai;

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, error};
use tuneline_abstraction::{
    ChatMessage, Model, ModelError, ModelParameters, ModelResponse, ModelUsage, Role,
};

pub use dataset_archive::{download_archive, extract_archive, fetch_dataset, ArchiveError, DEFAULT_DATASET_URL};
pub use fine_tuning::{FineTuningJob, FineTuningJobError, OpenAIFineTuningClient, RemoteJobStatus, UploadedFile};
pub use grading::{AnswerPayload, GradingClient, DEFAULT_REPORT_URL, REPORT_TASK};
pub use openai::{OpenAIModel, DEFAULT_OPENAI_BASE_URL};

/// Maps a non-success HTTP status and body to a `ModelError`.
///
/// 401/403 become authentication errors, 402/429 quota errors, everything else a
/// response error carrying the body.
pub(crate) fn map_http_error(
    provider: &str,
    status: reqwest::StatusCode,
    body: &str,
    operation: &str,
) -> ModelError {
    error!(provider, status = %status, error = %body, operation, "remote service returned error status");

    match status.as_u16() {
        401 | 403 => ModelError::AuthenticationError(format!("{operation} rejected ({status}): {body}")),
        402 | 429 => ModelError::QuotaExceeded {
            provider: provider.to_string(),
            message: Some(body.to_string()),
        },
        _ => ModelError::ModelResponseError(format!("{operation} failed ({status}): {body}")),
    }
}

/// A `Model` that answers from a script keyed by the last user turn.
///
/// Unknown prompts get the default reply; prompts listed in `failures` return a
/// request error.
#[derive(Debug, Default)]
pub struct MockModel {
    id: String,
    default_reply: String,
    replies: HashMap<String, String>,
    failures: Vec<String>,
}

impl MockModel {
    /// Creates a new `MockModel` that always answers `default_reply`.
    #[must_use]
    pub fn new(id: impl Into<String>, default_reply: impl Into<String>) -> Self {
        Self { id: id.into(), default_reply: default_reply.into(), ..Self::default() }
    }

    /// Answer `reply` whenever the last user turn equals `prompt`.
    #[must_use]
    pub fn with_reply(mut self, prompt: impl Into<String>, reply: impl Into<String>) -> Self {
        self.replies.insert(prompt.into(), reply.into());
        self
    }

    /// Fail the request whenever the last user turn equals `prompt`.
    #[must_use]
    pub fn with_failure(mut self, prompt: impl Into<String>) -> Self {
        self.failures.push(prompt.into());
        self
    }
}

#[async_trait]
impl Model for MockModel {
    async fn generate_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.id,
            message_count = messages.len(),
            parameters = ?parameters,
            "MockModel generating chat completion"
        );

        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        if self.failures.iter().any(|f| f == prompt) {
            return Err(ModelError::RequestError(format!("scripted failure for: {prompt}")));
        }

        let content = self.replies.get(prompt).cloned().unwrap_or_else(|| self.default_reply.clone());

        let prompt_tokens = messages.iter().map(|m| count_tokens(&m.content)).sum::<u32>();
        let completion_tokens = count_tokens(&content);

        Ok(ModelResponse {
            content,
            model_id: Some(self.id.clone()),
            usage: Some(ModelUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
        })
    }

    fn model_id(&self) -> &str {
        &self.id
    }
}

/// Count tokens in a string (simplified: word count).
fn count_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_model_scripted_replies() {
        let model = MockModel::new("mock", "0").with_reply("1,2,3", "1").with_failure("boom");

        let reply = model
            .generate_chat_completion(&[ChatMessage::system("validate data"), ChatMessage::user("1,2,3")], None)
            .await
            .unwrap();
        assert_eq!(reply.content, "1");

        let reply = model.generate_chat_completion(&[ChatMessage::user("other")], None).await.unwrap();
        assert_eq!(reply.content, "0");

        let err = model.generate_chat_completion(&[ChatMessage::user("boom")], None).await;
        assert!(matches!(err, Err(ModelError::RequestError(_))));
    }

    #[test]
    fn test_map_http_error_classes() {
        let err = map_http_error("openai", reqwest::StatusCode::UNAUTHORIZED, "nope", "upload");
        assert!(matches!(err, ModelError::AuthenticationError(_)));

        let err = map_http_error("openai", reqwest::StatusCode::TOO_MANY_REQUESTS, "slow", "upload");
        assert!(matches!(err, ModelError::QuotaExceeded { .. }));

        let err = map_http_error("openai", reqwest::StatusCode::BAD_REQUEST, "bad file", "upload");
        match err {
            ModelError::ModelResponseError(msg) => assert!(msg.contains("bad file")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
