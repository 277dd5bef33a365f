//! Helper script bridge.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use forumcp_core::BypassTechnique;
use tracing::{debug, error, instrument, warn};

use super::{BypassRequest, BypassResponse};
use crate::error::{BridgeError, ProcessError};
use crate::host::ProcessRunner;

/// Timeout used when a request carries none.
const DEFAULT_HELPER_TIMEOUT_SECS: u64 = 30;

/// Extra time a helper gets beyond the requested timeout before it is killed.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

/// Runs `<interpreter> <script>` once per request.
///
/// The request envelope goes to stdin, which is then closed. The whole of
/// stdout must be one JSON response envelope; stderr is only logged.
#[derive(Debug, Clone)]
pub struct ScriptBridge {
    technique: BypassTechnique,
    interpreter: String,
    script: PathBuf,
    runner: ProcessRunner,
    kill_grace: Duration,
}

impl ScriptBridge {
    /// Creates a bridge for a technique's script inside `helper_dir`.
    pub fn new(technique: BypassTechnique, interpreter: impl Into<String>, helper_dir: &Path) -> Self {
        let script = helper_dir.join(technique.script_name());
        Self::with_script(technique, interpreter, script)
    }

    /// Creates a bridge for an explicit script path.
    pub fn with_script(
        technique: BypassTechnique,
        interpreter: impl Into<String>,
        script: impl Into<PathBuf>,
    ) -> Self {
        let script = script.into();
        if !script.exists() {
            warn!(technique = %technique, script = %script.display(), "Bypass helper script not found");
        }
        Self {
            technique,
            interpreter: interpreter.into(),
            script,
            runner: ProcessRunner::new(),
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    /// Sets the watchdog grace period.
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    /// The technique this bridge runs.
    pub fn technique(&self) -> BypassTechnique {
        self.technique
    }

    /// Path of the helper script.
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Sends one request envelope and reads the response envelope.
    #[instrument(skip(self, request), fields(technique = %self.technique, method = %request.method, url = %request.url))]
    pub async fn exchange(&self, request: &BypassRequest) -> Result<BypassResponse, BridgeError> {
        let technique = self.technique;
        let input = serde_json::to_vec(request).map_err(|e| BridgeError::Io {
            technique,
            source: io::Error::other(e),
        })?;

        let requested = Duration::from_secs(request.timeout.unwrap_or(DEFAULT_HELPER_TIMEOUT_SECS));
        let watchdog = requested + self.kill_grace;
        let script = self.script.to_string_lossy().into_owned();

        debug!(interpreter = %self.interpreter, script = %script, "Spawning bypass helper");
        let output = self
            .runner
            .run_with_stdin(&self.interpreter, &[script.as_str()], &input, watchdog)
            .await
            .map_err(|e| match e {
                ProcessError::NotFound(cmd) => {
                    error!(interpreter = %cmd, "Bypass interpreter not found");
                    BridgeError::SpawnFailed {
                        technique,
                        interpreter: cmd,
                        source: io::Error::new(io::ErrorKind::NotFound, "not found on PATH"),
                    }
                }
                ProcessError::Timeout(after) => BridgeError::Timeout { technique, after },
                ProcessError::Io(source) => BridgeError::SpawnFailed {
                    technique,
                    interpreter: self.interpreter.clone(),
                    source,
                },
            })?;

        if !output.stderr.is_empty() {
            debug!(stderr = %output.stderr.trim_end(), "Bypass helper stderr");
        }
        debug!(exit_code = ?output.exit_code, stdout_len = output.stdout.len(), "Bypass helper exited");

        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            let missing_dependencies = output.stderr.contains("ModuleNotFoundError")
                || output.stderr.contains("ImportError");
            let err = BridgeError::EmptyOutput {
                technique,
                exit_code: output.exit_code,
                missing_dependencies,
            };
            error!(error = %err, "Bypass helper produced no output");
            return Err(err);
        }

        let binary_output = looks_binary(&output.stdout);
        if binary_output {
            error!("Bypass helper stdout contains binary data");
        }

        let response: BypassResponse = serde_json::from_slice(&output.stdout).map_err(|source| {
            let err = BridgeError::InvalidJson {
                technique,
                source,
                binary_output,
            };
            error!(error = %err, stdout_len = output.stdout.len(), "Failed to parse bypass response");
            err
        })?;

        if !response.success {
            warn!(
                error = response.error.as_deref().unwrap_or("unknown"),
                error_type = response.error_type.as_deref().unwrap_or("unknown"),
                "Bypass helper reported failure"
            );
        }

        Ok(response)
    }
}

/// Returns true for invalid UTF-8 or control bytes other than whitespace.
fn looks_binary(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_err()
        || bytes
            .iter()
            .any(|&b| matches!(b, 0x00..=0x08 | 0x0B | 0x0C | 0x0E..=0x1F | 0x7F))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_binary() {
        assert!(!looks_binary(b"{\"success\": true}\n"));
        assert!(!looks_binary("{\"body\": \"caf\u{e9}\"}".as_bytes()));
        assert!(looks_binary(&[0x1f, 0x8b, 0x08, 0x00]));
        assert!(looks_binary(b"{\"a\":\x01}"));
    }

    #[test]
    fn test_script_path_from_helper_dir() {
        let bridge = ScriptBridge::new(BypassTechnique::CurlCffi, "python3", Path::new("/opt/helpers"));
        assert_eq!(bridge.script(), Path::new("/opt/helpers/curl_cffi_wrapper.py"));
    }
}
