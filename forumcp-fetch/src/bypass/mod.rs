//! Cloudflare bypass helpers.
//!
//! A bypass technique is an external helper that performs one HTTP request
//! per invocation. The request and response are single JSON documents (the
//! envelope) exchanged over the helper's stdin and stdout.
//!
//! - [`BypassTransport`] - Capability trait implemented by each technique
//! - [`ScriptBridge`] - Drives a helper script through an interpreter
//! - [`CloudscraperTransport`], [`CurlCffiTransport`] - The two techniques

use std::collections::HashMap;

use async_trait::async_trait;
use forumcp_core::{BypassTechnique, LoginCredentials};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BridgeError;

pub mod bridge;
pub mod cloudscraper;
pub mod curl_cffi;

pub use bridge::ScriptBridge;
pub use cloudscraper::CloudscraperTransport;
pub use curl_cffi::CurlCffiTransport;

// ============================================================================
// Envelope
// ============================================================================

/// Request envelope written to a helper's stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BypassRequest {
    /// Absolute URL.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// Full outgoing header map.
    pub headers: HashMap<String, String>,
    /// Serialized request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Current cookie jar.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub cookies: HashMap<String, String>,
    /// Timeout in seconds the helper should honour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Login credentials, for helpers that can log in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<LoginCredentials>,
}

/// Response envelope read from a helper's stdout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BypassResponse {
    /// Whether the helper completed the request.
    pub success: bool,
    /// HTTP status of the upstream response.
    #[serde(default)]
    pub status: Option<u16>,
    /// Upstream response headers.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    /// Upstream body: JSON or text.
    #[serde(default)]
    pub body: Option<Value>,
    /// Cookies after the request.
    #[serde(default)]
    pub cookies: Option<HashMap<String, String>>,
    /// CSRF token obtained during login.
    #[serde(default)]
    pub csrf_token: Option<String>,
    /// Informational message.
    #[serde(default)]
    pub message: Option<String>,
    /// Error message when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
    /// Error class name when `success` is false.
    #[serde(default)]
    pub error_type: Option<String>,
}

impl BypassResponse {
    /// Returns a response header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_ref()?
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// One bypass technique.
///
/// Implementations must not interpret the upstream status: an envelope with
/// `success: true` is returned as-is even when `status` is 4xx/5xx.
#[async_trait]
pub trait BypassTransport: Send + Sync {
    /// Which technique this is.
    fn technique(&self) -> BypassTechnique;

    /// Performs one request.
    async fn request(&self, request: &BypassRequest) -> Result<BypassResponse, BridgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_envelope_shape() {
        let request = BypassRequest {
            url: "https://a.example/latest.json".into(),
            method: "GET".into(),
            headers: HashMap::from([("Accept".to_string(), "*/*".to_string())]),
            body: None,
            cookies: HashMap::new(),
            timeout: Some(15),
            login: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["method"], "GET");
        assert_eq!(json["timeout"], 15);
        assert!(json.get("body").is_none());
        assert!(json.get("cookies").is_none());
        assert!(json.get("login").is_none());
    }

    #[test]
    fn test_response_envelope_minimal() {
        let response: BypassResponse =
            serde_json::from_str(r#"{"success": false, "error": "blocked"}"#).unwrap();

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("blocked"));
        assert!(response.status.is_none());
    }

    #[test]
    fn test_response_header_lookup() {
        let response: BypassResponse = serde_json::from_str(
            r#"{"success": true, "status": 200, "headers": {"content-type": "application/json"}}"#,
        )
        .unwrap();

        assert_eq!(response.header("Content-Type"), Some("application/json"));
    }
}
