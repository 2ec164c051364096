//! Bounded asynchronous process execution.

use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::command_spec::CommandSpec;
use exemplar_utils::error::RunnerError;

/// Captured result of a finished (or killed) process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the process was killed by a signal or timed out.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: Option<i32>, timed_out: bool) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            timed_out,
        }
    }

    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }
}

/// Run `spec` to completion or until `timeout` elapses.
///
/// A timeout is not an error: the child is killed and the output comes back
/// with `timed_out` set. Only failing to start the program is an error.
pub async fn run_command(spec: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
    let program = spec.program.to_string_lossy().into_owned();
    debug!(command = %spec.display(), timeout_secs = timeout.as_secs(), "Spawning process");

    let mut child = spec.to_tokio_command().spawn().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            RunnerError::ToolNotFound {
                tool: program.clone(),
            }
        } else {
            RunnerError::Spawn {
                program: program.clone(),
                reason: e.to_string(),
            }
        }
    })?;

    // Feed stdin from a separate task so a chatty child cannot deadlock on a
    // full stdout pipe while we are still writing.
    if let (Some(input), Some(mut stdin)) = (spec.stdin.clone(), child.stdin.take()) {
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&input).await {
                debug!(error = %e, "Child closed stdin early");
            }
        });
    }

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(ProcessOutput::new(
            output.stdout,
            output.stderr,
            output.status.code(),
            false,
        )),
        Ok(Err(e)) => Err(RunnerError::Spawn {
            program,
            reason: e.to_string(),
        }),
        Err(_) => {
            // Dropping the wait future drops the child, and kill_on_drop reaps it.
            warn!(command = %spec.display(), timeout_secs = timeout.as_secs(), "Process timed out");
            Ok(ProcessOutput::new(Vec::new(), Vec::new(), None, true))
        }
    }
}
