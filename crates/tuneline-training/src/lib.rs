//! tuneline training
//!
//! The data side of the fine-tuning pipeline:
//! - Turning labeled and unlabeled source lines into chat records
//! - Assembling and writing the training and verification JSONL streams
//! - Submitting a fine-tuning job and polling it to a terminal status
//! - Classifying the verification stream and formatting the positional answer
//! - Recording runs so later steps can find the trained model

pub mod artifacts;
pub mod builders;
pub mod dataset;
pub mod error;
pub mod inference;
pub mod job;
pub mod layout;
pub mod monitor;
pub mod progress;
pub mod record;
pub mod registry;
pub mod report;
pub mod trainer;

pub use artifacts::{dataset_id_for_file, sha256_file, RunManifest};
pub use builders::{
    assemble_dataset, prepare_dataset, read_source, read_training_jsonl, read_verification_jsonl, write_jsonl,
    AssembledDataset, AssemblyReport,
};
pub use dataset::{compute_dataset_id, DatasetFiles, DatasetId, Provenance, RawLine};
pub use error::{TrainingError, TrainingResult};
pub use inference::{classify_all, InferenceOptions, DEFAULT_CONCURRENCY};
pub use job::{JobHandle, JobId, JobStatus, DEFAULT_BASE_MODEL};
pub use layout::WorkspaceLayout;
pub use monitor::{JobMonitor, PollPolicy, Sleeper, TokioSleeper, DEFAULT_POLL_INTERVAL};
pub use progress::{NullProgressSink, ProgressEvent, ProgressSink, StdoutProgressSink};
pub use record::{build_record, Record, TrainingRecord, VerificationRecord, SYSTEM_INSTRUCTION};
pub use registry::{discover_runs, latest_fine_tuned_model, write_manifest};
pub use report::{format_answer, ClassificationResult, Prediction};
pub use trainer::{FineTuningBackend, OpenAIFineTuner};
