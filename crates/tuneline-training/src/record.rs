//! Turning one source line into a chat-shaped example.

use crate::dataset::RawLine;
use serde::{Deserialize, Serialize};
use tuneline_abstraction::{ChatMessage, Role};

/// System turn shared by every training and verification example.
pub const SYSTEM_INSTRUCTION: &str = "validate data";

/// Literal marker some verification lines start with.
pub const VERIFY_PREFIX: &str = "number=";

pub const POSITIVE_LABEL: &str = "1";
pub const NEGATIVE_LABEL: &str = "0";

/// A labeled example: system, user, assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRecord {
    messages: Vec<ChatMessage>,
}

impl TrainingRecord {
    #[must_use]
    pub fn new(content: impl Into<String>, label: bool) -> Self {
        let answer = if label { POSITIVE_LABEL } else { NEGATIVE_LABEL };
        Self {
            messages: vec![
                ChatMessage::system(SYSTEM_INSTRUCTION),
                ChatMessage::user(content),
                ChatMessage::assistant(answer),
            ],
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn user_content(&self) -> &str {
        turn(&self.messages, Role::User)
    }

    #[must_use]
    pub fn label(&self) -> bool {
        turn(&self.messages, Role::Assistant) == POSITIVE_LABEL
    }
}

/// An unlabeled example: system and user turns only.
///
/// `line` is the 1-based line number in the source file, before blank lines
/// were filtered out. Answers are reported against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    messages: Vec<ChatMessage>,
    #[serde(default)]
    line: usize,
}

impl VerificationRecord {
    /// Builds the record, dropping a leading `number=` marker.
    #[must_use]
    pub fn new(content: &str, line: usize) -> Self {
        let content = content.strip_prefix(VERIFY_PREFIX).unwrap_or(content);
        Self {
            messages: vec![ChatMessage::system(SYSTEM_INSTRUCTION), ChatMessage::user(content)],
            line,
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn user_content(&self) -> &str {
        turn(&self.messages, Role::User)
    }

    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    pub(crate) fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    /// Checks the two-turn shape after reading a record back from disk.
    pub(crate) fn is_well_formed(&self) -> bool {
        matches!(
            self.messages.as_slice(),
            [ChatMessage { role: Role::System, .. }, ChatMessage { role: Role::User, .. }]
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Training(TrainingRecord),
    Verification(VerificationRecord),
}

fn turn(messages: &[ChatMessage], role: Role) -> &str {
    messages.iter().find(|m| m.role == role).map_or("", |m| m.content.as_str())
}

/// Builds the record for one raw line.
///
/// Returns `None` for lines that are blank after trimming. Labeled provenance
/// yields a `TrainingRecord`, unlabeled a `VerificationRecord`.
#[must_use]
pub fn build_record(line: &RawLine) -> Option<Record> {
    let content = line.content.trim();
    if content.is_empty() {
        return None;
    }

    Some(match line.provenance.label() {
        Some(label) => Record::Training(TrainingRecord::new(content, label)),
        None => Record::Verification(VerificationRecord::new(content, line.line_number)),
    })
}
