//! Text the agent says to the user.

use crate::task::Slot;

pub const GREETING: &str = "Hello! I'm your AI assistant. What should I call you?";

pub const TASK_ACCEPTED: &str = "I can help with that.";

pub const READY: &str =
    "Perfect! I have all the details. I'll now open the browser and send the email.";

pub const CHAT_FALLBACK: &str =
    "Sorry, I didn't quite catch that. I can send an email for you whenever you're ready.";

pub fn welcome(name: &str) -> String {
    format!("Nice to meet you, {name}! How can I help you today?")
}

/// The question asked for `slot`. Identical every time it is asked.
pub fn slot_prompt(slot: Slot) -> &'static str {
    match slot {
        Slot::CredentialUser => "To access your email, I'll need your Gmail address.",
        Slot::CredentialPassword => "Thanks! And what's the password for this account?",
        Slot::RecipientAddress => "What's the recipient's email address?",
        Slot::SubjectLine => "What should the subject line be?",
        Slot::PrimaryReason => "What would you like the email to be about?",
        Slot::ContextDetails => "Are there any other specific details to include, like dates?",
    }
}

/// Acknowledgement of a new task, asking for its first slot in one message.
pub fn task_accepted(first: Slot) -> String {
    format!("{TASK_ACCEPTED} {}", slot_prompt(first))
}

pub fn sent(recipient: &str) -> String {
    format!("✅ Email sent successfully to {recipient}!")
}

pub fn what_else(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("What else can I do for you, {name}?"),
        None => "What else can I do for you?".to_string(),
    }
}

pub fn automation_failed(detail: &str) -> String {
    format!("❌ An error occurred during browser automation: {detail}")
}
