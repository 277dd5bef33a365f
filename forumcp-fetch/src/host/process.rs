//! Subprocess execution.
//!
//! Used to drive bypass helper scripts over stdin/stdout and to probe the
//! Python interpreter at startup.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::error::ProcessError;

// ============================================================================
// Process Output
// ============================================================================

/// Output from a process execution.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Raw standard output.
    pub stdout: Vec<u8>,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Exit code, `None` when killed by a signal.
    pub exit_code: Option<i32>,
    /// How long the command took to execute.
    pub duration: Duration,
}

impl ProcessOutput {
    /// Returns true if the command exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Standard output, lossily decoded.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

// ============================================================================
// Process Runner
// ============================================================================

/// Runs short-lived subprocesses.
///
/// The child is killed if the timeout fires or the returned future is
/// dropped before it exits.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    pub fn new() -> Self {
        Self
    }

    /// Run a command with a timeout and no input.
    #[instrument(skip(self), fields(cmd = %cmd, timeout = ?timeout))]
    pub async fn run_with_timeout(
        &self,
        cmd: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        self.run_internal(cmd, args, None, timeout).await
    }

    /// Run a command, write `input` to its stdin and close it.
    #[instrument(skip(self, input), fields(cmd = %cmd, input_len = input.len(), timeout = ?timeout))]
    pub async fn run_with_stdin(
        &self,
        cmd: &str,
        args: &[&str],
        input: &[u8],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        self.run_internal(cmd, args, Some(input), timeout).await
    }

    async fn run_internal(
        &self,
        cmd: &str,
        args: &[&str],
        input: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        debug!(args = ?args, "Running command");

        let cmd_path = self.which(cmd).ok_or_else(|| {
            warn!(cmd = %cmd, "Command not found");
            ProcessError::NotFound(cmd.to_string())
        })?;

        let start = Instant::now();

        let mut command = Command::new(&cmd_path);
        command
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => ProcessError::NotFound(cmd.to_string()),
            _ => ProcessError::Io(e),
        })?;

        let stdin = child.stdin.take();
        let write_input = async move {
            if let (Some(mut stdin), Some(input)) = (stdin, input) {
                stdin.write_all(input).await?;
                stdin.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        };

        let run = async { tokio::join!(write_input, child.wait_with_output()) };
        let (written, output) = match tokio::time::timeout(timeout, run).await {
            Ok(result) => result,
            Err(_) => {
                warn!(cmd = %cmd, timeout = ?timeout, "Command timed out, killed");
                return Err(ProcessError::Timeout(timeout));
            }
        };

        // The child may exit without reading its input.
        if let Err(e) = written {
            if e.kind() == ErrorKind::BrokenPipe {
                debug!("Child closed stdin before reading all input");
            } else {
                return Err(ProcessError::Io(e));
            }
        }
        let output = output?;

        let result = ProcessOutput {
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            duration: start.elapsed(),
        };

        debug!(
            exit_code = ?result.exit_code,
            duration = ?result.duration,
            stdout_len = result.stdout.len(),
            stderr_len = result.stderr.len(),
            "Command completed"
        );

        Ok(result)
    }

    /// Check if a command exists on PATH.
    pub fn command_exists(&self, cmd: &str) -> bool {
        self.which(cmd).is_some()
    }

    /// Find the path to a command (absolute paths are checked directly).
    pub fn which(&self, cmd: &str) -> Option<PathBuf> {
        which::which(cmd).ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
