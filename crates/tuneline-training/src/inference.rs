//! Classifying the verification stream with a trained model.

use crate::record::VerificationRecord;
use crate::report::{ClassificationResult, Prediction};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use tuneline_abstraction::{Model, ModelParameters};

/// Requests kept in flight when nothing else is configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferenceOptions {
    pub concurrency: usize,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self { concurrency: DEFAULT_CONCURRENCY }
    }
}

async fn classify_one(model: &dyn Model, record: &VerificationRecord) -> (usize, Prediction) {
    let line = record.line();
    match model
        .generate_chat_completion(record.messages(), Some(ModelParameters::classification()))
        .await
    {
        Ok(response) => {
            let answer = response.content.trim();
            debug!(line, answer, "Classified line");
            if answer.is_empty() {
                warn!(line, "Model returned an empty answer, skipping line");
                (line, Prediction::Skip)
            } else {
                (line, Prediction::Label(answer.to_string()))
            }
        }
        Err(e) => {
            warn!(line, error = %e, "Inference failed, skipping line");
            (line, Prediction::Skip)
        }
    }
}

/// Runs every record through `model`, at most `options.concurrency` at a time.
///
/// Results are keyed by each record's source line, so a failed line becomes a
/// `Skip` at its own position and never moves the lines after it.
pub async fn classify_all(
    model: &dyn Model,
    records: &[VerificationRecord],
    options: InferenceOptions,
) -> ClassificationResult {
    info!(model_id = model.model_id(), lines = records.len(), concurrency = options.concurrency, "Running inference");

    let entries: Vec<(usize, Prediction)> = stream::iter(records)
        .map(|record| classify_one(model, record))
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;

    ClassificationResult::from_indexed(entries)
}
