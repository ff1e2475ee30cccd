//! Prompt text for the LLM-backed extraction collaborator.

use crate::task::{Slot, TaskRecord};

/// System message shared by every structured-output call.
pub const EXTRACTION_SYSTEM: &str =
    "You are a data extraction assistant. Output only valid JSON.";

/// System message for conversational replies.
pub const CHAT_SYSTEM: &str = "\
You are a friendly AI assistant that can also send emails on the user's behalf \
by operating their browser. Keep replies short: 1-3 sentences.";

/// Human-readable description of what a slot holds.
fn slot_description(slot: Slot) -> &'static str {
    match slot {
        Slot::CredentialUser => "the user's own email address used to sign in",
        Slot::CredentialPassword => "the user's email account password",
        Slot::RecipientAddress => "the email address of the recipient",
        Slot::SubjectLine => "a subject line for the email",
        Slot::PrimaryReason => "the main reason for the email, e.g. 'leave application'",
        Slot::ContextDetails => "specific details to include, such as dates or topics",
    }
}

/// Classify an utterance as a task request or general chat.
pub fn intent_prompt(text: &str) -> String {
    format!(
        "Classify the user's message.\n\
         - \"task\": the user wants an email written or sent.\n\
         - \"chat\": anything else (greetings, questions, small talk).\n\n\
         Message:\n\"{text}\"\n\n\
         Respond with ONLY this JSON: {{\"intent\": \"task\" | \"chat\"}}"
    )
}

/// Extract a single slot from the user's reply to that slot's question.
pub fn slot_prompt(text: &str, slot: Slot) -> String {
    let key = slot.key();
    let description = slot_description(slot);
    format!(
        "The user was asked for \"{key}\" ({description}).\n\
         From the user's response below, extract the value for \"{key}\".\n\
         Your entire response must be a JSON object containing ONLY that key, \
         for example: {{\"{key}\": \"the extracted value\"}}\n\
         If the response does not contain a value, respond with {{}}.\n\
         Do not add any other text, explanations, or markdown formatting.\n\n\
         User's response:\n\"{text}\""
    )
}

/// Conversational reply, personalised when the name is known.
pub fn chat_prompt(text: &str, known_name: Option<&str>) -> String {
    let addressee = match known_name {
        Some(name) => format!("The user's name is {name}. "),
        None => String::new(),
    };
    format!(
        "{addressee}Reply naturally to the message below. If it fits, mention \
         that you can send an email for them.\n\nMessage:\n\"{text}\""
    )
}

/// Subject and body for the finished task.
pub fn content_prompt(record: &TaskRecord) -> String {
    let reason = record.get(Slot::PrimaryReason).unwrap_or("a general request");
    let details = record.get(Slot::ContextDetails).unwrap_or(reason);
    let signature = record
        .participant_name()
        .map(|name| format!("\nSign the email as {name}."))
        .unwrap_or_default();
    let subject_rule = match record.get(Slot::SubjectLine) {
        Some(subject) => format!("Use exactly this subject: \"{subject}\"."),
        None => "Write a short, suitable subject line.".to_string(),
    };
    format!(
        "You are a professional assistant writing a concise and clear email.\n\
         The primary reason for the email is: {reason}\n\
         Key details to include are: {details}\n\
         {subject_rule}\n\
         Start the body with a suitable greeting like \"Dear Sir/Madam,\".{signature}\n\n\
         Respond with ONLY valid JSON: {{\"subject\": \"...\", \"body\": \"...\"}}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_prompt_names_the_key() {
        let prompt = slot_prompt("send it to bob@x.io", Slot::RecipientAddress);
        assert!(prompt.contains("\"recipient_address\""));
        assert!(prompt.contains("bob@x.io"));
    }

    #[test]
    fn content_prompt_uses_record_fields() {
        let record = TaskRecord::new()
            .with_participant_name("Ada")
            .with_slot(Slot::PrimaryReason, "leave application")
            .unwrap()
            .with_slot(Slot::ContextDetails, "March 3rd to 5th")
            .unwrap();
        let prompt = content_prompt(&record);
        assert!(prompt.contains("leave application"));
        assert!(prompt.contains("March 3rd to 5th"));
        assert!(prompt.contains("Sign the email as Ada"));
        assert!(prompt.contains("Write a short, suitable subject line"));
    }

    #[test]
    fn content_prompt_pins_user_subject() {
        let record = TaskRecord::new()
            .with_slot(Slot::SubjectLine, "Sick day")
            .unwrap();
        let prompt = content_prompt(&record);
        assert!(prompt.contains("Use exactly this subject: \"Sick day\""));
        assert!(prompt.contains("Key details to include are: a general request"));
    }

    #[test]
    fn chat_prompt_mentions_name_when_known() {
        assert!(chat_prompt("hi", Some("Ada")).contains("name is Ada"));
        assert!(!chat_prompt("hi", None).contains("name is"));
    }
}
