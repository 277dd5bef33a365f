//! Fetch error types.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use forumcp_core::BypassTechnique;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// HTTP Status Error
// ============================================================================

/// A non-2xx response from the forum.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpStatusError {
    /// HTTP status code.
    pub status: u16,
    /// Human readable message, e.g. `HTTP 404 Not Found`.
    pub message: String,
    /// Response body, parsed as JSON when possible, else a JSON string.
    pub body: Option<Value>,
}

impl HttpStatusError {
    /// Creates an error for a status code with the canonical reason phrase.
    pub fn new(status: u16, body: Option<Value>) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("");
        let message = format!("HTTP {status} {reason}").trim_end().to_string();
        Self {
            status,
            message,
            body,
        }
    }

    /// Creates an error from raw body text, parsing JSON when possible.
    pub fn from_text(status: u16, text: &str) -> Self {
        let body = if text.is_empty() {
            None
        } else {
            Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
        };
        Self::new(status, body)
    }

    /// Returns true for 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        self.status == 429 || self.status >= 500
    }

    /// Best-effort error detail from a Discourse error body.
    pub fn detail(&self) -> Option<String> {
        let body = self.body.as_ref()?;
        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            let joined: Vec<&str> = errors.iter().filter_map(Value::as_str).collect();
            if !joined.is_empty() {
                return Some(joined.join("; "));
            }
        }
        body.get("error")
            .and_then(Value::as_str)
            .map(ToString::to_string)
    }
}

impl fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail() {
            Some(detail) => write!(f, "{} ({detail})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl StdError for HttpStatusError {}

// ============================================================================
// Connect Failure
// ============================================================================

/// Why a connection could not be established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    /// Host name did not resolve.
    Dns,
    /// TLS handshake or certificate problem.
    Tls,
    /// Anything else (refused, unreachable, reset).
    Connectivity,
}

impl ConnectFailure {
    fn hint(self) -> &'static str {
        match self {
            Self::Dns => "DNS lookup failed; check the site host name and your resolver",
            Self::Tls => "TLS handshake failed; check certificates and any intercepting proxy",
            Self::Connectivity => "connection failed; check network connectivity and firewalls",
        }
    }
}

impl fmt::Display for ConnectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hint())
    }
}

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for forum requests.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Non-2xx response (direct or inside a successful bypass envelope).
    #[error(transparent)]
    Http(#[from] HttpStatusError),

    /// The per-request timeout fired.
    #[error("Request to {url} timed out after {}ms", .after.as_millis())]
    Timeout {
        /// Requested URL.
        url: String,
        /// Configured timeout.
        after: Duration,
    },

    /// DNS, TLS or connectivity failure.
    #[error("Could not reach {url}: {kind} ({detail})")]
    Connect {
        /// Requested URL.
        url: String,
        /// Failure classification.
        kind: ConnectFailure,
        /// Underlying error chain.
        detail: String,
    },

    /// Any other transport failure.
    #[error("Network error for {url}: {detail}")]
    Network {
        /// Requested URL.
        url: String,
        /// Underlying error chain.
        detail: String,
    },

    /// The caller's cancellation token fired.
    #[error("Request cancelled")]
    Cancelled,

    /// The path could not be resolved against the base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A header value could not be encoded.
    #[error("Invalid header {name}: {reason}")]
    InvalidHeader {
        /// Header name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A bypass helper failed at the process or envelope level.
    #[error("Bypass error: {0}")]
    Bridge(#[from] BridgeError),

    /// Both bypass techniques failed.
    #[error("All bypass techniques failed. {primary_technique}: {primary}; {fallback_technique}: {fallback}")]
    BypassExhausted {
        /// Technique tried first.
        primary_technique: BypassTechnique,
        /// Its failure.
        primary: Box<FetchError>,
        /// Technique tried second.
        fallback_technique: BypassTechnique,
        /// Its failure.
        fallback: Box<FetchError>,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FetchError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => Some(e.status),
            _ => None,
        }
    }

    /// Returns true if this is an application-level HTTP status error.
    pub fn is_http_status(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    /// Returns true for errors worth retrying (429 and 5xx only).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_transient())
    }

    /// Classifies a reqwest transport error.
    pub fn from_reqwest(url: &str, err: &reqwest::Error, timeout: Duration) -> Self {
        let detail = error_chain(err);
        if err.is_timeout() {
            return Self::Timeout {
                url: url.to_string(),
                after: timeout,
            };
        }
        if err.is_connect() {
            return Self::Connect {
                url: url.to_string(),
                kind: classify_connect(&detail),
                detail,
            };
        }
        Self::Network {
            url: url.to_string(),
            detail,
        }
    }
}

/// Joins an error and all of its sources into one line.
fn error_chain(err: &dyn StdError) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        source = inner.source();
    }
    parts.join(": ")
}

fn classify_connect(detail: &str) -> ConnectFailure {
    let lower = detail.to_ascii_lowercase();
    if lower.contains("dns") || lower.contains("failed to lookup") || lower.contains("name or service not known") {
        ConnectFailure::Dns
    } else if lower.contains("certificate") || lower.contains("tls") || lower.contains("handshake") {
        ConnectFailure::Tls
    } else {
        ConnectFailure::Connectivity
    }
}

// ============================================================================
// Bridge Error
// ============================================================================

/// Error type for bypass helper processes.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The interpreter could not be started.
    #[error(
        "Failed to spawn {technique} helper with '{interpreter}': {source}. \
         Make sure Python is installed and on PATH (try `{interpreter} --version`)"
    )]
    SpawnFailed {
        /// Technique being invoked.
        technique: BypassTechnique,
        /// Interpreter command.
        interpreter: String,
        /// Spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The helper exited without writing anything to stdout.
    #[error("{technique} helper produced no output (exit code {}). {hint}", fmt_code(.exit_code), hint = empty_output_hint(.technique, .missing_dependencies))]
    EmptyOutput {
        /// Technique being invoked.
        technique: BypassTechnique,
        /// Exit code, if the process exited normally.
        exit_code: Option<i32>,
        /// stderr mentioned a missing Python module.
        missing_dependencies: bool,
    },

    /// stdout was not a single JSON document.
    #[error("{technique} helper returned unparseable output: {source}. {}", invalid_json_hint(.binary_output))]
    InvalidJson {
        /// Technique being invoked.
        technique: BypassTechnique,
        /// Parse error.
        #[source]
        source: serde_json::Error,
        /// stdout contained control or non-text bytes.
        binary_output: bool,
    },

    /// The helper reported `success: false`.
    #[error("{technique} helper failed: {error}{}", type_suffix(.error_type))]
    HelperFailed {
        /// Technique being invoked.
        technique: BypassTechnique,
        /// Helper's error message.
        error: String,
        /// Helper's error class name.
        error_type: Option<String>,
    },

    /// The helper did not exit in time and was killed.
    #[error("{technique} helper did not finish within {}s and was killed", .after.as_secs())]
    Timeout {
        /// Technique being invoked.
        technique: BypassTechnique,
        /// Watchdog limit.
        after: Duration,
    },

    /// I/O error talking to the helper.
    #[error("{technique} helper I/O error: {source}")]
    Io {
        /// Technique being invoked.
        technique: BypassTechnique,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl BridgeError {
    /// The technique that failed.
    pub fn technique(&self) -> BypassTechnique {
        match self {
            Self::SpawnFailed { technique, .. }
            | Self::EmptyOutput { technique, .. }
            | Self::InvalidJson { technique, .. }
            | Self::HelperFailed { technique, .. }
            | Self::Timeout { technique, .. }
            | Self::Io { technique, .. } => *technique,
        }
    }
}

fn fmt_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

fn type_suffix(error_type: &Option<String>) -> String {
    error_type
        .as_ref()
        .map(|t| format!(" ({t})"))
        .unwrap_or_default()
}

fn invalid_json_hint(binary_output: &bool) -> &'static str {
    if *binary_output {
        "Output contains binary data; the response was probably compressed or corrupted"
    } else {
        "The helper may have printed diagnostics to stdout"
    }
}

fn empty_output_hint(technique: &BypassTechnique, missing_dependencies: &bool) -> String {
    if *missing_dependencies {
        format!(
            "Python dependencies missing; run: pip3 install {}",
            technique.python_package().replace('_', "-")
        )
    } else {
        "Likely causes: Python dependencies not installed, the helper crashed (see stderr in debug logs), \
         or the wrong Python executable"
            .to_string()
    }
}

// ============================================================================
// Process Error
// ============================================================================

/// Error type for process operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Command not found.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// Command timed out and was killed.
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_message() {
        let err = HttpStatusError::new(404, None);
        assert_eq!(err.message, "HTTP 404 Not Found");
        assert!(!err.is_transient());
        assert!(HttpStatusError::new(429, None).is_transient());
        assert!(HttpStatusError::new(502, None).is_transient());
    }

    #[test]
    fn test_body_parsed_as_json_when_possible() {
        let err = HttpStatusError::from_text(422, r#"{"errors": ["Title is too short"]}"#);
        assert_eq!(err.detail().as_deref(), Some("Title is too short"));
        assert_eq!(err.to_string(), "HTTP 422 Unprocessable Entity (Title is too short)");

        let err = HttpStatusError::from_text(500, "<html>oops</html>");
        assert_eq!(err.body, Some(Value::String("<html>oops</html>".into())));
    }

    #[test]
    fn test_only_http_status_errors_are_transient() {
        let timeout = FetchError::Timeout {
            url: "https://a.example".into(),
            after: Duration::from_secs(1),
        };
        assert!(!timeout.is_transient());
        assert!(FetchError::Http(HttpStatusError::new(503, None)).is_transient());
        assert!(!FetchError::Http(HttpStatusError::new(403, None)).is_transient());
    }

    #[test]
    fn test_classify_connect() {
        assert_eq!(
            classify_connect("error trying to connect: dns error: failed to lookup address"),
            ConnectFailure::Dns
        );
        assert_eq!(
            classify_connect("invalid peer certificate: UnknownIssuer"),
            ConnectFailure::Tls
        );
        assert_eq!(
            classify_connect("tcp connect error: Connection refused"),
            ConnectFailure::Connectivity
        );
    }

    #[test]
    fn test_empty_output_hint_names_package() {
        let err = BridgeError::EmptyOutput {
            technique: BypassTechnique::CurlCffi,
            exit_code: Some(1),
            missing_dependencies: true,
        };
        let text = err.to_string();
        assert!(text.contains("pip3 install curl-cffi"));
        assert!(text.contains("exit code 1"));
    }

    #[test]
    fn test_helper_failed_message() {
        let err = BridgeError::HelperFailed {
            technique: BypassTechnique::Cloudscraper,
            error: "challenge loop".into(),
            error_type: Some("CloudflareChallengeError".into()),
        };
        assert_eq!(
            err.to_string(),
            "cloudscraper helper failed: challenge loop (CloudflareChallengeError)"
        );
    }
}
