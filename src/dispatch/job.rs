//! One invocation of the worker, derived from a complete task record.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::extraction::TaskContent;
use crate::task::{Slot, TaskRecord, TaskVariant};

/// Arguments and identity for a single worker run.
///
/// Built only from a record that satisfies the completeness predicate. The
/// worker receives everything it needs on its command line; nothing else is
/// shared with it.
#[derive(Clone)]
pub struct WorkerJob {
    pub id: Uuid,
    pub variant: TaskVariant,
    pub recipient: String,
    args: Vec<String>,
    /// Positions in `args` that must not appear in logs.
    secret_positions: Vec<usize>,
    pub created_at: DateTime<Utc>,
}

impl WorkerJob {
    /// Build the positional argument vector for `variant`.
    ///
    /// - credentialed: `[user, password, recipient, subject, body]`
    /// - guided: `[recipient, subject, body]`
    ///
    /// The credentialed subject comes from generated content; the guided
    /// subject is the one the user supplied. Returns `None` if the record is
    /// incomplete.
    pub fn from_record(
        record: &TaskRecord,
        variant: TaskVariant,
        content: &TaskContent,
    ) -> Option<Self> {
        if !record.is_complete(variant) {
            return None;
        }
        let recipient = record.get(Slot::RecipientAddress)?.to_string();

        let (args, secret_positions) = match variant {
            TaskVariant::Credentialed => {
                let (user, password) = record.credentials()?;
                let subject = record
                    .get(Slot::SubjectLine)
                    .unwrap_or(content.subject.as_str());
                (
                    vec![
                        user.to_string(),
                        password.to_string(),
                        recipient.clone(),
                        subject.to_string(),
                        content.body.clone(),
                    ],
                    vec![1],
                )
            }
            TaskVariant::Guided => {
                let subject = record.get(Slot::SubjectLine)?;
                (
                    vec![recipient.clone(), subject.to_string(), content.body.clone()],
                    Vec::new(),
                )
            }
        };

        Some(Self {
            id: Uuid::new_v4(),
            variant,
            recipient,
            args,
            secret_positions,
            created_at: Utc::now(),
        })
    }

    /// Positional arguments appended after the worker's own command line.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The argument vector with secrets masked, for logs.
    pub fn redacted_args(&self) -> Vec<&str> {
        self.args
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                if self.secret_positions.contains(&i) {
                    "[REDACTED]"
                } else {
                    arg.as_str()
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for WorkerJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerJob")
            .field("id", &self.id)
            .field("variant", &self.variant)
            .field("args", &self.redacted_args())
            .field("created_at", &self.created_at)
            .finish()
    }
}
