//! Pure record transitions.
//!
//! Each function takes the old record plus whatever the turn produced and
//! returns the new record or the reason the turn did not fill anything. The
//! caller decides what to say.

use crate::error::SlotError;
use crate::extraction::{SlotExtraction, TaskContent};
use crate::task::{Slot, TaskRecord, validate};

/// Fill `slot` from the collaborator's answer.
///
/// Only the targeted key is honored; values reported under other keys are
/// discarded. The record is unchanged on any error.
pub fn fill_slot(
    record: &TaskRecord,
    slot: Slot,
    extraction: Option<&SlotExtraction>,
) -> Result<TaskRecord, SlotError> {
    let raw = extraction
        .and_then(|e| e.value_for(slot))
        .ok_or(SlotError::Extraction { slot })?;
    let value = validate(slot, raw)?;
    record.with_slot(slot, value)
}

/// Fill an optional slot, keeping the raw reply when extraction finds no
/// value under its key.
///
/// An optional slot is answered in one turn: "no" or "nothing else" is
/// stored as-is rather than re-asked.
pub fn fill_optional_slot(
    record: &TaskRecord,
    slot: Slot,
    extraction: Option<&SlotExtraction>,
    reply: &str,
) -> Result<TaskRecord, SlotError> {
    match fill_slot(record, slot, extraction) {
        Err(SlotError::Extraction { .. }) => {
            let value = validate(slot, reply)?;
            record.with_slot(slot, value)
        }
        other => other,
    }
}

/// Record the task request that opened this cycle.
pub fn begin_task(record: &TaskRecord, utterance: &str) -> Result<TaskRecord, SlotError> {
    let reason = validate(Slot::PrimaryReason, utterance)?;
    record.with_slot(Slot::PrimaryReason, reason)
}

/// Store a generated subject when the user did not supply one.
pub fn adopt_subject(record: &TaskRecord, content: &TaskContent) -> TaskRecord {
    if record.is_set(Slot::SubjectLine) {
        return record.clone();
    }
    match validate(Slot::SubjectLine, &content.subject) {
        Ok(subject) => record
            .with_slot(Slot::SubjectLine, subject)
            .unwrap_or_else(|_| record.clone()),
        Err(_) => record.clone(),
    }
}

/// Content used when generation produced nothing.
pub fn fallback_content(record: &TaskRecord) -> TaskContent {
    let body = record
        .get(Slot::ContextDetails)
        .or_else(|| record.get(Slot::PrimaryReason))
        .unwrap_or_default()
        .to_string();
    TaskContent {
        subject: "Request".to_string(),
        body,
    }
}
