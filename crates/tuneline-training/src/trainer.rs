use crate::error::TrainingResult;
use crate::job::{JobHandle, JobId};
use async_trait::async_trait;
use std::path::Path;
use tuneline_models::OpenAIFineTuningClient;

/// A remote service that trains models from uploaded JSONL files.
#[async_trait]
pub trait FineTuningBackend: Send + Sync {
    fn id(&self) -> &'static str;

    /// Uploads the training stream and returns the service's file id.
    async fn upload_training_file(&self, path: &Path) -> TrainingResult<String>;

    async fn create_job(&self, training_file: &str, base_model: &str) -> TrainingResult<JobHandle>;

    /// Fetches the current job state without changing it.
    async fn poll(&self, job_id: &JobId) -> TrainingResult<JobHandle>;

    /// Upload + create. Returns the handle in whatever state the service reports.
    async fn submit(&self, path: &Path, base_model: &str) -> TrainingResult<(String, JobHandle)> {
        let file_id = self.upload_training_file(path).await?;
        let handle = self.create_job(&file_id, base_model).await?;
        Ok((file_id, handle))
    }
}

/// `FineTuningBackend` over the OpenAI files and fine-tuning endpoints.
#[derive(Debug, Clone)]
pub struct OpenAIFineTuner {
    client: OpenAIFineTuningClient,
}

impl OpenAIFineTuner {
    #[must_use]
    pub fn new(client: OpenAIFineTuningClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FineTuningBackend for OpenAIFineTuner {
    fn id(&self) -> &'static str {
        "openai"
    }

    async fn upload_training_file(&self, path: &Path) -> TrainingResult<String> {
        Ok(self.client.upload_file(path).await?.id)
    }

    async fn create_job(&self, training_file: &str, base_model: &str) -> TrainingResult<JobHandle> {
        Ok(self.client.create_job(training_file, base_model).await?.into())
    }

    async fn poll(&self, job_id: &JobId) -> TrainingResult<JobHandle> {
        Ok(self.client.retrieve_job(&job_id.0).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrainingError;
    use crate::job::JobStatus;

    #[tokio::test]
    async fn test_openai_submit_uploads_then_creates() {
        let mut server = mockito::Server::new_async().await;
        let upload = server
            .mock("POST", "/v1/files")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"file-1","purpose":"fine-tune"}"#)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/v1/fine_tuning/jobs")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"training_file": "file-1"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"ftjob-9","status":"queued"}"#)
            .create_async()
            .await;

        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("training.jsonl");
        std::fs::write(&path, "{}\n").unwrap();

        let backend = OpenAIFineTuner::new(OpenAIFineTuningClient::with_base_url(
            "k".to_string(),
            format!("{}/v1", server.url()),
        ));
        let (file_id, handle) = backend.submit(&path, "gpt-4o-mini-2024-07-18").await.unwrap();

        assert_eq!(backend.id(), "openai");
        assert_eq!(file_id, "file-1");
        assert_eq!(handle, JobHandle::new("ftjob-9", JobStatus::Queued));
        upload.assert_async().await;
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_transport_errors_surface_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/fine_tuning/jobs/ftjob-1")
            .with_status(500)
            .with_body("upstream exploded")
            .expect(1)
            .create_async()
            .await;

        let backend = OpenAIFineTuner::new(OpenAIFineTuningClient::with_base_url(
            "k".to_string(),
            format!("{}/v1", server.url()),
        ));
        let err = backend.poll(&JobId("ftjob-1".to_string())).await.unwrap_err();

        assert!(matches!(err, TrainingError::Transport(_)));
        mock.assert_async().await;
    }
}
