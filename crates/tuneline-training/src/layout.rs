use crate::error::TrainingResult;
use crate::job::JobId;
use std::path::{Path, PathBuf};

/// Filesystem layout of a tuneline workspace.
///
/// ```text
/// <root>/data/                 extracted source files
/// <root>/training.jsonl        training stream
/// <root>/verify.jsonl          verification stream
/// <root>/.tuneline/runs/<job>/ run manifests
/// ```
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    root: PathBuf,
}

impl WorkspaceLayout {
    #[must_use]
    pub fn for_workspace_root(workspace_root: &Path) -> Self {
        Self { root: workspace_root.to_path_buf() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    #[must_use]
    pub fn training_jsonl_path(&self) -> PathBuf {
        self.root.join("training.jsonl")
    }

    #[must_use]
    pub fn verification_jsonl_path(&self) -> PathBuf {
        self.root.join("verify.jsonl")
    }

    #[must_use]
    pub fn runs_root(&self) -> PathBuf {
        self.root.join(".tuneline").join("runs")
    }

    #[must_use]
    pub fn run_dir(&self, job_id: &JobId) -> PathBuf {
        self.runs_root().join(job_id.0.as_str())
    }

    #[must_use]
    pub fn run_manifest_path(&self, job_id: &JobId) -> PathBuf {
        self.run_dir(job_id).join("run_manifest.json")
    }

    pub fn ensure_run_dir(&self, job_id: &JobId) -> TrainingResult<()> {
        std::fs::create_dir_all(self.run_dir(job_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let temp = TempDir::new().unwrap();
        let layout = WorkspaceLayout::for_workspace_root(temp.path());
        let id = JobId("ftjob-1".to_string());

        assert!(layout.runs_root().to_string_lossy().contains(".tuneline"));
        assert!(layout.run_manifest_path(&id).ends_with("ftjob-1/run_manifest.json"));
        assert_eq!(layout.data_dir(), temp.path().join("data"));

        layout.ensure_run_dir(&id).unwrap();
        assert!(layout.run_dir(&id).is_dir());
    }
}
