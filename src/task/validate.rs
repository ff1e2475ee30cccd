//! Local shape checks applied to extracted slot values before they are stored.

use std::sync::LazyLock;

use regex::Regex;

use super::record::Slot;
use crate::error::SlotError;

/// `local@domain.tld` with no whitespace and a dot in the domain part.
static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("address regex is valid")
});

/// Whether `value` looks like an email address.
pub fn looks_like_address(value: &str) -> bool {
    ADDRESS_RE.is_match(value)
}

/// Normalize and check a value for `slot`. Returns the value to store.
pub fn validate(slot: Slot, raw: &str) -> Result<String, SlotError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(SlotError::Validation {
            slot,
            reason: "empty value".to_string(),
        });
    }
    if slot.is_address() && !looks_like_address(value) {
        return Err(SlotError::Validation {
            slot,
            reason: format!("'{value}' is not an email address"),
        });
    }
    Ok(value.to_string())
}
