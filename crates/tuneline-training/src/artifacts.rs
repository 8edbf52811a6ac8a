use crate::dataset::DatasetId;
use crate::error::{TrainingError, TrainingResult};
use crate::job::{JobHandle, JobId, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Record of one fine-tuning run, kept next to the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    pub job_id: JobId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub backend: String,
    pub base_model: String,
    pub training_file_id: String,
    pub training_path: PathBuf,
    pub dataset_id: DatasetId,
    pub status: JobStatus,
    #[serde(default)]
    pub fine_tuned_model: Option<String>,
    #[serde(default)]
    pub trained_tokens: Option<u64>,
    #[serde(default)]
    pub diagnostics: Option<String>,
}

impl RunManifest {
    #[must_use]
    pub fn new(
        handle: &JobHandle,
        backend: &str,
        base_model: &str,
        training_file_id: &str,
        training_path: &Path,
        dataset_id: DatasetId,
    ) -> Self {
        let now = Utc::now();
        let mut manifest = Self {
            job_id: handle.id.clone(),
            created_at: now,
            updated_at: now,
            backend: backend.to_string(),
            base_model: base_model.to_string(),
            training_file_id: training_file_id.to_string(),
            training_path: training_path.to_path_buf(),
            dataset_id,
            status: handle.status,
            fine_tuned_model: None,
            trained_tokens: None,
            diagnostics: None,
        };
        manifest.update_from(handle);
        manifest
    }

    /// Copies the latest remote state into the manifest.
    pub fn update_from(&mut self, handle: &JobHandle) {
        self.status = handle.status;
        self.updated_at = Utc::now();
        if let Some(model) = handle.fine_tuned_model() {
            self.fine_tuned_model = Some(model.to_string());
        }
        if handle.trained_tokens.is_some() {
            self.trained_tokens = handle.trained_tokens;
        }
        if handle.diagnostics.is_some() {
            self.diagnostics.clone_from(&handle.diagnostics);
        }
    }
}

pub fn sha256_file(path: &Path) -> TrainingResult<String> {
    let bytes = std::fs::read(path)
        .map_err(|source| TrainingError::SourceRead { path: path.to_path_buf(), source })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Content id of a training stream already written to disk.
pub fn dataset_id_for_file(path: &Path) -> TrainingResult<DatasetId> {
    if !path.exists() {
        return Err(TrainingError::Artifact(format!(
            "training stream does not exist: {} (run `tuneline prepare` first)",
            path.display()
        )));
    }
    Ok(DatasetId(sha256_file(path)?))
}
