use crate::dataset::{compute_dataset_id, DatasetFiles, DatasetId, Provenance, RawLine};
use crate::error::{TrainingError, TrainingResult};
use crate::layout::WorkspaceLayout;
use crate::record::{build_record, Record, TrainingRecord, VerificationRecord};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Training and verification streams built from one data directory.
#[derive(Debug, Clone, Default)]
pub struct AssembledDataset {
    /// Positives in file order, then negatives in file order.
    pub training: Vec<TrainingRecord>,
    /// Verification lines in file order, each carrying its source line number.
    pub verification: Vec<VerificationRecord>,
    /// Lines dropped because they were not valid UTF-8.
    pub skipped_lines: usize,
}

impl AssembledDataset {
    #[must_use]
    pub fn positives(&self) -> usize {
        self.training.iter().filter(|r| r.label()).count()
    }

    #[must_use]
    pub fn negatives(&self) -> usize {
        self.training.len() - self.positives()
    }
}

/// What `prepare_dataset` wrote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyReport {
    pub dataset_id: DatasetId,
    pub positives: usize,
    pub negatives: usize,
    pub verification: usize,
    pub skipped_lines: usize,
    pub training_path: PathBuf,
    pub verification_path: PathBuf,
}

/// Reads one source file into decoded lines.
///
/// Every line keeps its 1-based position in the file. Lines that are not valid
/// UTF-8 are logged and left out; the returned count says how many.
pub fn read_source(path: &Path, provenance: Provenance) -> TrainingResult<(Vec<RawLine>, usize)> {
    let bytes = std::fs::read(path)
        .map_err(|source| TrainingError::SourceRead { path: path.to_path_buf(), source })?;

    let mut lines = Vec::new();
    let mut skipped = 0;

    for (idx, raw) in bytes.split(|b| *b == b'\n').enumerate() {
        let line_number = idx + 1;
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);

        match std::str::from_utf8(raw) {
            Ok(content) => lines.push(RawLine { content: content.to_string(), line_number, provenance }),
            Err(e) => {
                let err = TrainingError::Decode {
                    path: path.to_path_buf(),
                    line: line_number,
                    reason: e.to_string(),
                };
                warn!(error = %err, "Skipping undecodable line");
                skipped += 1;
            }
        }
    }

    debug!(path = %path.display(), lines = lines.len(), skipped, "Read source file");
    Ok((lines, skipped))
}

/// Builds both streams from the three files in `data_dir`.
///
/// Any file that cannot be opened aborts the whole assembly. Blank lines are
/// dropped silently.
pub fn assemble_dataset(data_dir: &Path, files: &DatasetFiles) -> TrainingResult<AssembledDataset> {
    let mut dataset = AssembledDataset::default();

    for (path, provenance) in files.resolve(data_dir) {
        let (lines, skipped) = read_source(&path, provenance)?;
        dataset.skipped_lines += skipped;

        for line in &lines {
            match build_record(line) {
                Some(Record::Training(record)) => dataset.training.push(record),
                Some(Record::Verification(record)) => dataset.verification.push(record),
                None => {}
            }
        }
    }

    Ok(dataset)
}

/// Writes one JSON object per line, replacing whatever was at `path`.
pub fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> TrainingResult<()> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, out)?;
    Ok(())
}

/// Reads a JSONL training stream back.
pub fn read_training_jsonl(path: &Path) -> TrainingResult<Vec<TrainingRecord>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|source| TrainingError::SourceRead { path: path.to_path_buf(), source })?;
    let mut records = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: TrainingRecord = serde_json::from_str(line).map_err(|e| {
            TrainingError::Dataset(format!("failed to parse jsonl line {}: {}", idx + 1, e))
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Reads a JSONL verification stream back.
///
/// Records written by `prepare_dataset` carry their source line number, and
/// those numbers must strictly increase. A stream where no record carries one is
/// numbered by position among the non-empty lines. Mixing the two is an error.
pub fn read_verification_jsonl(path: &Path) -> TrainingResult<Vec<VerificationRecord>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|source| TrainingError::SourceRead { path: path.to_path_buf(), source })?;
    let mut records = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: VerificationRecord = serde_json::from_str(line).map_err(|e| {
            TrainingError::Dataset(format!("failed to parse jsonl line {}: {}", idx + 1, e))
        })?;
        if !record.is_well_formed() {
            return Err(TrainingError::Dataset(format!(
                "jsonl line {} is not a system + user conversation",
                idx + 1
            )));
        }
        records.push(record);
    }

    let numbered = records.iter().filter(|r| r.line() != 0).count();
    if numbered == 0 {
        for (idx, record) in records.iter_mut().enumerate() {
            record.set_line(idx + 1);
        }
    } else if numbered < records.len() {
        return Err(TrainingError::Dataset(format!(
            "{} mixes records with and without a line number",
            path.display()
        )));
    } else if let Some(pair) = records.windows(2).find(|pair| pair[0].line() >= pair[1].line()) {
        return Err(TrainingError::Dataset(format!(
            "{}: line {} follows line {}, line numbers must increase",
            path.display(),
            pair[1].line(),
            pair[0].line()
        )));
    }

    Ok(records)
}

/// Assembles the data directory and writes both streams where `layout` says.
pub fn prepare_dataset(
    data_dir: &Path,
    files: &DatasetFiles,
    layout: &WorkspaceLayout,
) -> TrainingResult<AssemblyReport> {
    let dataset = assemble_dataset(data_dir, files)?;
    if dataset.training.is_empty() {
        return Err(TrainingError::Dataset(format!(
            "no training examples found in {}",
            data_dir.display()
        )));
    }

    let training_path = layout.training_jsonl_path();
    let verification_path = layout.verification_jsonl_path();
    write_jsonl(&training_path, &dataset.training)?;
    write_jsonl(&verification_path, &dataset.verification)?;

    let report = AssemblyReport {
        dataset_id: compute_dataset_id(&dataset.training)?,
        positives: dataset.positives(),
        negatives: dataset.negatives(),
        verification: dataset.verification.len(),
        skipped_lines: dataset.skipped_lines,
        training_path,
        verification_path,
    };

    info!(
        dataset_id = %report.dataset_id,
        positives = report.positives,
        negatives = report.negatives,
        verification = report.verification,
        skipped = report.skipped_lines,
        "Dataset prepared"
    );
    Ok(report)
}
