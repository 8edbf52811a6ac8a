//! Per-line predictions and the positional answer built from them.

use crate::record::POSITIVE_LABEL;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prediction {
    Label(String),
    /// No usable answer for this line; it never appears in the report.
    Skip,
}

impl Prediction {
    #[must_use]
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Label(label) if label == POSITIVE_LABEL)
    }
}

impl From<&str> for Prediction {
    fn from(value: &str) -> Self {
        Self::Label(value.to_string())
    }
}

/// Predictions keyed by 1-based source line, kept in ascending line order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    entries: Vec<(usize, Prediction)>,
}

impl ClassificationResult {
    /// Builds from `(line, prediction)` pairs in any order.
    #[must_use]
    pub fn from_indexed(mut entries: Vec<(usize, Prediction)>) -> Self {
        entries.sort_by_key(|(line, _)| *line);
        Self { entries }
    }

    /// Numbers a plain sequence 1, 2, 3, ...
    #[must_use]
    pub fn from_sequence(predictions: impl IntoIterator<Item = Prediction>) -> Self {
        Self { entries: predictions.into_iter().enumerate().map(|(idx, p)| (idx + 1, p)).collect() }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Prediction)> {
        self.entries.iter().map(|(line, p)| (*line, p))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.entries.iter().filter(|(_, p)| *p == Prediction::Skip).count()
    }
}

/// Two-digit, 1-based line numbers of every positive prediction.
#[must_use]
pub fn format_answer(results: &ClassificationResult) -> Vec<String> {
    results
        .iter()
        .filter(|(_, prediction)| prediction.is_positive())
        .map(|(line, _)| format!("{line:02}"))
        .collect()
}
