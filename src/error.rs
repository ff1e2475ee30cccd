//! Error types for the browser agent.

use std::path::PathBuf;

use crate::task::Slot;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Session channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} disconnected: {reason}")]
    Disconnected { name: String, reason: String },

    #[error("Failed to send frame on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// A conversational turn that did not fill its slot.
///
/// Both variants are recovered locally by re-prompting the same slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("No value extracted for {slot}")]
    Extraction { slot: Slot },

    #[error("Value for {slot} rejected: {reason}")]
    Validation { slot: Slot, reason: String },

    #[error("Slot {slot} is already set for this task cycle")]
    AlreadySet { slot: Slot },
}

/// Worker process failures, surfaced to the user as a status frame.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Failed to launch worker {program}: {reason}")]
    Launch { program: String, reason: String },

    #[error("Worker exited with code {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    #[error("Worker task aborted: {0}")]
    Join(String),
}

/// Screenshot artifacts the worker announced but the parser could not use.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Screenshot file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("Failed to read screenshot {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
