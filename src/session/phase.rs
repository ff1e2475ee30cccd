//! Session state machine phases.

use serde::{Deserialize, Serialize};

use crate::task::Slot;

/// Where a session is in its conversation.
///
/// AwaitingName → Routing → CollectingSlot(..) → Ready → Dispatching →
/// Succeeded → Routing, or Dispatching → Failed → Ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "slot")]
pub enum SessionPhase {
    AwaitingName,
    Routing,
    CollectingSlot(Slot),
    Ready,
    Dispatching,
    Succeeded,
    Failed,
}

impl SessionPhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, target),
            (AwaitingName, Routing)
                | (Routing, Routing)
                | (Routing, CollectingSlot(_))
                | (Routing, Ready)
                | (CollectingSlot(_), CollectingSlot(_))
                | (CollectingSlot(_), Ready)
                | (Ready, Dispatching)
                | (Dispatching, Succeeded)
                | (Dispatching, Failed)
                | (Succeeded, Routing)
                | (Failed, Ready)
        )
    }

    /// Phases that only exist while a turn is being processed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Dispatching | Self::Succeeded | Self::Failed)
    }
}

impl Default for SessionPhase {
    fn default() -> Self {
        Self::AwaitingName
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingName => write!(f, "awaiting_name"),
            Self::Routing => write!(f, "routing"),
            Self::CollectingSlot(slot) => write!(f, "collecting_slot({slot})"),
            Self::Ready => write!(f, "ready"),
            Self::Dispatching => write!(f, "dispatching"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
