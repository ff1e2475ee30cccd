//! Extraction collaborator: turns free text into intents, slot values and
//! generated content.
//!
//! The session state machine only sees the [`Extractor`] trait, so tests can
//! substitute a deterministic stub. Every operation models failure as `None`;
//! nothing here is allowed to take the session down.

pub mod llm;
pub mod parse;
pub mod prompts;

pub use llm::LlmExtractor;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::task::{Slot, TaskRecord};

/// Coarse classification of a post-introduction utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// The user wants the agent to carry out a task.
    Task,
    /// Anything else; answered conversationally.
    Chat,
}

impl Intent {
    /// Parse a label as returned by the model. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().trim_matches('"').to_lowercase().as_str() {
            "task" | "email_task" => Some(Self::Task),
            "chat" | "general_chat" => Some(Self::Chat),
            _ => None,
        }
    }
}

/// Key/value pairs the collaborator pulled out of an utterance.
///
/// May contain keys other than the one asked for; callers pick the key
/// they targeted and ignore the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotExtraction {
    values: HashMap<String, String>,
}

impl SlotExtraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-entry extraction for `slot`.
    pub fn single(slot: Slot, value: impl Into<String>) -> Self {
        Self::new().with(slot.key(), value)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Value reported under `slot`'s key, if any.
    pub fn value_for(&self, slot: Slot) -> Option<&str> {
        self.values.get(slot.key()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<HashMap<String, String>> for SlotExtraction {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

/// Generated subject and body for the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContent {
    pub subject: String,
    pub body: String,
}

/// The extraction collaborator contract.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Classify an utterance as a task request or chit-chat.
    async fn classify_intent(&self, text: &str) -> Option<Intent>;

    /// Pull the value for `slot` out of a reply to that slot's prompt.
    async fn extract_slot(&self, text: &str, slot: Slot) -> Option<SlotExtraction>;

    /// Produce a conversational reply.
    async fn generate_chat_reply(&self, text: &str, known_name: Option<&str>) -> Option<String>;

    /// Write the subject and body for a complete record.
    async fn generate_task_content(&self, record: &TaskRecord) -> Option<TaskContent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_labels() {
        assert_eq!(Intent::from_label("task"), Some(Intent::Task));
        assert_eq!(Intent::from_label(" \"CHAT\"\n"), Some(Intent::Chat));
        assert_eq!(Intent::from_label("email_task"), Some(Intent::Task));
        assert_eq!(Intent::from_label("maybe"), None);
    }

    #[test]
    fn extraction_only_answers_for_reported_key() {
        let extraction = SlotExtraction::new()
            .with("subject_line", "Hello")
            .with("unrelated", "x");
        assert_eq!(extraction.value_for(Slot::SubjectLine), Some("Hello"));
        assert_eq!(extraction.value_for(Slot::RecipientAddress), None);
        assert!(!extraction.is_empty());
    }
}
