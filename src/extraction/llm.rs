//! LLM-backed extraction collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::parse::{first_json_object, string_fields};
use super::prompts::{
    CHAT_SYSTEM, EXTRACTION_SYSTEM, chat_prompt, content_prompt, intent_prompt, slot_prompt,
};
use super::{Extractor, Intent, SlotExtraction, TaskContent};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::task::{Slot, TaskRecord};

/// Extraction collaborator that asks an LLM for every answer.
///
/// Credential slots are answered locally from the raw reply so that secrets
/// never leave the process.
pub struct LlmExtractor {
    llm: Arc<dyn LlmProvider>,
}

impl LlmExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Run one completion; any failure is logged and mapped to `None`.
    async fn ask(
        &self,
        system: &str,
        prompt: String,
        max_tokens: u32,
        temperature: f32,
    ) -> Option<String> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(system),
            ChatMessage::user(prompt),
        ])
        .with_max_tokens(max_tokens)
        .with_temperature(temperature);

        match self.llm.complete(request).await {
            Ok(response) => {
                debug!(
                    model = %self.llm.model_name(),
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "LLM call completed"
                );
                Some(response.content)
            }
            Err(e) => {
                warn!(model = %self.llm.model_name(), error = %e, "LLM call failed");
                None
            }
        }
    }

    async fn ask_json(
        &self,
        prompt: String,
        max_tokens: u32,
    ) -> Option<serde_json::Map<String, serde_json::Value>> {
        let text = self.ask(EXTRACTION_SYSTEM, prompt, max_tokens, 0.0).await?;
        let parsed = first_json_object(&text);
        if parsed.is_none() {
            warn!(
                raw = %text.chars().take(200).collect::<String>(),
                "Unparseable extraction response"
            );
        }
        parsed
    }
}

#[async_trait]
impl Extractor for LlmExtractor {
    async fn classify_intent(&self, text: &str) -> Option<Intent> {
        let map = self.ask_json(intent_prompt(text), 32).await?;
        let label = map.get("intent")?.as_str()?;
        let intent = Intent::from_label(label);
        debug!(?intent, label, "Classified intent");
        intent
    }

    async fn extract_slot(&self, text: &str, slot: Slot) -> Option<SlotExtraction> {
        if matches!(slot, Slot::CredentialUser | Slot::CredentialPassword) {
            let value = text.trim();
            return (!value.is_empty()).then(|| SlotExtraction::single(slot, value));
        }

        let map = self.ask_json(slot_prompt(text, slot), 256).await?;
        let extraction = SlotExtraction::from(string_fields(&map));
        (!extraction.is_empty()).then_some(extraction)
    }

    async fn generate_chat_reply(&self, text: &str, known_name: Option<&str>) -> Option<String> {
        let reply = self
            .ask(CHAT_SYSTEM, chat_prompt(text, known_name), 512, 0.7)
            .await?;
        let reply = reply.trim();
        (!reply.is_empty()).then(|| reply.to_string())
    }

    async fn generate_task_content(&self, record: &TaskRecord) -> Option<TaskContent> {
        let map = self.ask_json(content_prompt(record), 1024).await?;
        let fields = string_fields(&map);
        let body = fields.get("body")?.clone();
        let subject = fields
            .get("subject")
            .cloned()
            .unwrap_or_else(|| "Request".to_string());
        Some(TaskContent { subject, body })
    }
}
