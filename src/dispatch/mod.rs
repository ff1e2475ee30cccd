//! Job dispatch: run the worker for a complete task and turn its output into
//! an ordered list of progress events.

pub mod events;
pub mod job;
pub mod process;

pub use events::{AutomationEvent, parse_output};
pub use job::WorkerJob;
pub use process::{ProcessDispatcher, WorkerOutput};

use async_trait::async_trait;

use crate::error::WorkerError;

/// Successful worker run.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Events in the order the worker emitted them.
    pub events: Vec<AutomationEvent>,
    pub exit_code: i32,
}

/// Runs a job to completion.
///
/// The session machine depends only on this trait, so a streaming
/// implementation can replace the capture-then-parse one.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    async fn dispatch(&self, job: &WorkerJob) -> Result<DispatchOutcome, WorkerError>;
}
