//! Session state machine: turn-taking, slot filling and intent routing.

pub mod machine;
pub mod messages;
pub mod phase;
pub mod transition;

pub use machine::SessionMachine;
pub use phase::SessionPhase;

use crate::task::TaskVariant;

/// How post-introduction utterances are routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingMode {
    /// Classify each utterance; only task requests start a cycle.
    IntentGated,
    /// Every utterance in `Routing` starts a task cycle.
    Direct,
}

impl std::str::FromStr for RoutingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intent" | "intent_gated" => Ok(Self::IntentGated),
            "direct" => Ok(Self::Direct),
            other => Err(format!("unknown routing mode '{other}'")),
        }
    }
}

/// Per-deployment behavior shared by every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub variant: TaskVariant,
    pub routing: RoutingMode,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            variant: TaskVariant::Credentialed,
            routing: RoutingMode::IntentGated,
        }
    }
}
