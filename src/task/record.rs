//! The task record under construction and its completeness predicate.

use serde::{Deserialize, Serialize};

use crate::error::SlotError;

/// A single field of the task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    CredentialUser,
    CredentialPassword,
    RecipientAddress,
    SubjectLine,
    PrimaryReason,
    ContextDetails,
}

impl Slot {
    /// The key the extraction collaborator reports this slot under.
    pub fn key(&self) -> &'static str {
        match self {
            Self::CredentialUser => "credential_user",
            Self::CredentialPassword => "credential_password",
            Self::RecipientAddress => "recipient_address",
            Self::SubjectLine => "subject_line",
            Self::PrimaryReason => "primary_reason",
            Self::ContextDetails => "context_details",
        }
    }

    /// Whether this slot carries an email address.
    pub fn is_address(&self) -> bool {
        matches!(self, Self::CredentialUser | Self::RecipientAddress)
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Which completeness predicate a deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskVariant {
    /// The worker logs in with user-supplied credentials; the subject is generated.
    Credentialed,
    /// No credentials; the user supplies the subject line.
    Guided,
}

impl TaskVariant {
    /// Slots collected turn-by-turn after the task intent, in fixed order.
    ///
    /// Covers [`required`](Self::required) minus `PrimaryReason`, which is
    /// filled by routing. Optional slots only appear ahead of a required one,
    /// so they are always asked before the record can complete.
    pub fn slot_sequence(&self) -> &'static [Slot] {
        match self {
            Self::Credentialed => &[
                Slot::CredentialUser,
                Slot::CredentialPassword,
                Slot::ContextDetails,
                Slot::RecipientAddress,
            ],
            Self::Guided => &[Slot::RecipientAddress, Slot::SubjectLine],
        }
    }

    /// Whether `slot` is part of the completeness predicate.
    pub fn requires(&self, slot: Slot) -> bool {
        self.required().contains(&slot)
    }

    /// Slots that must be set before the task is dispatchable.
    pub fn required(&self) -> &'static [Slot] {
        match self {
            Self::Credentialed => &[
                Slot::CredentialUser,
                Slot::CredentialPassword,
                Slot::RecipientAddress,
                Slot::PrimaryReason,
            ],
            Self::Guided => &[Slot::RecipientAddress, Slot::SubjectLine, Slot::PrimaryReason],
        }
    }
}

impl std::fmt::Display for TaskVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credentialed => write!(f, "credentialed"),
            Self::Guided => write!(f, "guided"),
        }
    }
}

impl std::str::FromStr for TaskVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credentialed" | "a" => Ok(Self::Credentialed),
            "guided" | "b" => Ok(Self::Guided),
            other => Err(format!("unknown task variant '{other}'")),
        }
    }
}

/// The structured goal under construction.
///
/// Treated as a value: every transition returns a new record and leaves the
/// old one untouched. Fields are set at most once per task cycle.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TaskRecord {
    participant_name: Option<String>,
    credential_user: Option<String>,
    credential_password: Option<String>,
    recipient_address: Option<String>,
    subject_line: Option<String>,
    primary_reason: Option<String>,
    context_details: Option<String>,
}

impl TaskRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn participant_name(&self) -> Option<&str> {
        self.participant_name.as_deref()
    }

    /// Credential pair, present only once both halves are collected.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((
            self.credential_user.as_deref()?,
            self.credential_password.as_deref()?,
        ))
    }

    pub fn get(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::CredentialUser => self.credential_user.as_deref(),
            Slot::CredentialPassword => self.credential_password.as_deref(),
            Slot::RecipientAddress => self.recipient_address.as_deref(),
            Slot::SubjectLine => self.subject_line.as_deref(),
            Slot::PrimaryReason => self.primary_reason.as_deref(),
            Slot::ContextDetails => self.context_details.as_deref(),
        }
    }

    pub fn is_set(&self, slot: Slot) -> bool {
        self.get(slot).is_some()
    }

    /// True while a task cycle is underway (the task intent has been recorded).
    pub fn has_task(&self) -> bool {
        self.primary_reason.is_some()
    }

    /// Completeness predicate for the given deployment variant.
    pub fn is_complete(&self, variant: TaskVariant) -> bool {
        variant.required().iter().all(|slot| self.is_set(*slot))
    }

    /// The next slot to ask for, in the variant's fixed order. `None` once
    /// the record is complete, even if an optional slot is still empty.
    pub fn next_unset(&self, variant: TaskVariant) -> Option<Slot> {
        if self.is_complete(variant) {
            return None;
        }
        variant
            .slot_sequence()
            .iter()
            .copied()
            .find(|slot| !self.is_set(*slot))
    }

    /// Record the participant's name. Only the first name sticks.
    pub fn with_participant_name(&self, name: &str) -> Self {
        let mut next = self.clone();
        if next.participant_name.is_none() {
            next.participant_name = Some(name.trim().to_string());
        }
        next
    }

    /// Return a copy with `slot` set to `value`.
    ///
    /// Fails if the slot already holds a value in this cycle.
    pub fn with_slot(&self, slot: Slot, value: impl Into<String>) -> Result<Self, SlotError> {
        if self.is_set(slot) {
            return Err(SlotError::AlreadySet { slot });
        }
        let mut next = self.clone();
        let value = Some(value.into());
        match slot {
            Slot::CredentialUser => next.credential_user = value,
            Slot::CredentialPassword => next.credential_password = value,
            Slot::RecipientAddress => next.recipient_address = value,
            Slot::SubjectLine => next.subject_line = value,
            Slot::PrimaryReason => next.primary_reason = value,
            Slot::ContextDetails => next.context_details = value,
        }
        Ok(next)
    }

    /// Fresh record for the next task cycle. Only the participant name survives.
    pub fn next_cycle(&self) -> Self {
        Self {
            participant_name: self.participant_name.clone(),
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRecord")
            .field("participant_name", &self.participant_name)
            .field("credential_user", &self.credential_user)
            .field(
                "credential_password",
                &self.credential_password.as_ref().map(|_| "[REDACTED]"),
            )
            .field("recipient_address", &self.recipient_address)
            .field("subject_line", &self.subject_line)
            .field("primary_reason", &self.primary_reason)
            .field("context_details", &self.context_details)
            .finish()
    }
}
