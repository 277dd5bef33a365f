//! Python dependency probe for the bypass helpers.

use std::time::Duration;

use forumcp_fetch::{ProcessError, ProcessRunner};
use tracing::{debug, warn};

/// Modules the bypass helpers import.
const IMPORT_CHECK: &str = "import cloudscraper, curl_cffi";

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of probing the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PythonStatus {
    /// Interpreter found and both modules import.
    Ready,
    /// Interpreter not on PATH.
    InterpreterMissing,
    /// Interpreter ran but the import failed.
    ModulesMissing {
        /// Last line of stderr, e.g. `ModuleNotFoundError: ...`.
        detail: String,
    },
    /// The probe itself failed (timeout, I/O).
    Failed {
        /// What went wrong.
        detail: String,
    },
}

impl PythonStatus {
    /// Install hint for a failed probe.
    pub fn hint(&self, interpreter: &str) -> Option<String> {
        match self {
            PythonStatus::Ready => None,
            PythonStatus::InterpreterMissing => Some(format!(
                "Python interpreter '{interpreter}' not found. Install Python 3 or pass --python-path, or use --no-bypass."
            )),
            PythonStatus::ModulesMissing { .. } | PythonStatus::Failed { .. } => Some(format!(
                "Install the bypass dependencies with: {interpreter} -m pip install cloudscraper curl_cffi"
            )),
        }
    }
}

/// Runs `<interpreter> -c "import cloudscraper, curl_cffi"`.
pub async fn probe_python(interpreter: &str) -> PythonStatus {
    let runner = ProcessRunner::new();
    match runner
        .run_with_timeout(interpreter, &["-c", IMPORT_CHECK], PROBE_TIMEOUT)
        .await
    {
        Ok(output) if output.success() => PythonStatus::Ready,
        Ok(output) => PythonStatus::ModulesMissing {
            detail: output
                .stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("import failed")
                .trim()
                .to_string(),
        },
        Err(ProcessError::NotFound(_)) => PythonStatus::InterpreterMissing,
        Err(e) => PythonStatus::Failed {
            detail: e.to_string(),
        },
    }
}

/// Probes in the background and logs a warning if the helpers cannot run.
///
/// Never fails startup; requests routed through a helper will report the
/// problem themselves.
pub async fn warn_if_missing(interpreter: String) {
    let status = probe_python(&interpreter).await;
    match status.hint(&interpreter) {
        None => debug!(interpreter = %interpreter, "Bypass helper dependencies available"),
        Some(hint) => warn!(interpreter = %interpreter, status = ?status, "{hint}"),
    }
}
