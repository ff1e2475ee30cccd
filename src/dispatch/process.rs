//! Runs the worker as a child process and parses its captured output.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info};

use super::events::parse_output;
use super::job::WorkerJob;
use super::{DispatchOutcome, JobDispatcher};
use crate::error::WorkerError;

/// Raw result of one worker run.
#[derive(Debug, Clone)]
pub struct WorkerOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Launches the worker executable once per job.
///
/// Full capture, then parse: nothing is reported until the process exits.
/// The wait runs on its own task so a slow worker never holds up other
/// sessions. There is no timeout; a hung worker stalls its session.
#[derive(Debug, Clone)]
pub struct ProcessDispatcher {
    program: String,
    leading_args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ProcessDispatcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            working_dir: None,
        }
    }

    /// Arguments placed before the job's own positional arguments.
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    /// Spawn the worker for `job` and wait for it to exit.
    pub async fn run(&self, job: &WorkerJob) -> Result<WorkerOutput, WorkerError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .args(job.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| WorkerError::Launch {
            program: self.program.clone(),
            reason: e.to_string(),
        })?;

        let output = tokio::spawn(child.wait_with_output())
            .await
            .map_err(|e| WorkerError::Join(e.to_string()))?
            .map_err(|e| WorkerError::Launch {
                program: self.program.clone(),
                reason: format!("failed while waiting: {e}"),
            })?;

        Ok(WorkerOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

#[async_trait]
impl JobDispatcher for ProcessDispatcher {
    async fn dispatch(&self, job: &WorkerJob) -> Result<DispatchOutcome, WorkerError> {
        info!(
            job_id = %job.id,
            program = %self.program,
            args = ?job.redacted_args(),
            "Dispatching worker"
        );

        let output = self.run(job).await?;

        if output.exit_code != 0 {
            error!(
                job_id = %job.id,
                exit_code = output.exit_code,
                stdout = %output.stdout,
                stderr = %output.stderr,
                "Worker failed"
            );
            return Err(WorkerError::Failed {
                code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        let events = parse_output(&output.stdout).await;
        let elapsed = chrono::Utc::now() - job.created_at;
        info!(
            job_id = %job.id,
            events = events.len(),
            elapsed_ms = elapsed.num_milliseconds(),
            "Worker finished"
        );

        Ok(DispatchOutcome {
            events,
            exit_code: output.exit_code,
        })
    }
}
