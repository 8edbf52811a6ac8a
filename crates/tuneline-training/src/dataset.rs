use crate::error::TrainingResult;
use crate::record::TrainingRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Stable identifier for a training stream (content hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(pub String);

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Which source file a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Correct,
    Incorrect,
    Unlabeled,
}

impl Provenance {
    /// Training label carried by lines of this provenance.
    #[must_use]
    pub const fn label(self) -> Option<bool> {
        match self {
            Self::Correct => Some(true),
            Self::Incorrect => Some(false),
            Self::Unlabeled => None,
        }
    }
}

/// One decoded line of a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub content: String,
    /// 1-based, counted over every line of the file including blank ones.
    pub line_number: usize,
    pub provenance: Provenance,
}

/// Names of the three source files inside a data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetFiles {
    pub positive: PathBuf,
    pub negative: PathBuf,
    pub verification: PathBuf,
}

impl Default for DatasetFiles {
    fn default() -> Self {
        Self {
            positive: PathBuf::from("correct.txt"),
            // Spelled this way inside the published archive.
            negative: PathBuf::from("incorect.txt"),
            verification: PathBuf::from("verify.txt"),
        }
    }
}

impl DatasetFiles {
    /// The three files resolved against `data_dir`, with their provenance.
    #[must_use]
    pub fn resolve(&self, data_dir: &Path) -> [(PathBuf, Provenance); 3] {
        [
            (data_dir.join(&self.positive), Provenance::Correct),
            (data_dir.join(&self.negative), Provenance::Incorrect),
            (data_dir.join(&self.verification), Provenance::Unlabeled),
        ]
    }
}

pub fn compute_dataset_id(records: &[TrainingRecord]) -> TrainingResult<DatasetId> {
    let mut hasher = Sha256::new();

    for record in records {
        let bytes = serde_json::to_vec(record)?;
        hasher.update(bytes);
        hasher.update(b"\n");
    }

    Ok(DatasetId(hex::encode(hasher.finalize())))
}
