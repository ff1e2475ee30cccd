//! Slot model: the task record, its slots, and value checks.

pub mod record;
pub mod validate;

pub use record::{Slot, TaskRecord, TaskVariant};
pub use validate::{looks_like_address, validate};
