//! Bypass pipeline with primary/fallback techniques.
//!
//! In dual mode the primary technique is tried until it fails once at the
//! bypass level; from then on every request in the client's lifetime goes
//! straight to the fallback. HTTP status errors are application responses
//! and never trigger fallback.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use forumcp_core::{BypassMethod, BypassTechnique};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::bypass::{
    BypassRequest, BypassResponse, BypassTransport, CloudscraperTransport, CurlCffiTransport,
};
use crate::error::{BridgeError, FetchError, HttpStatusError};

// ============================================================================
// Bypass Outcome
// ============================================================================

/// A successful bypass request.
#[derive(Debug, Clone)]
pub struct BypassOutcome {
    /// Technique that produced the response.
    pub technique: BypassTechnique,
    /// Response envelope (`success: true`, status below 400).
    pub response: BypassResponse,
    /// How long the successful attempt took.
    pub duration: Duration,
}

// ============================================================================
// Bypass Pipeline
// ============================================================================

/// Routes requests through one or two bypass techniques.
pub struct BypassPipeline {
    primary: Arc<dyn BypassTransport>,
    fallback: Option<Arc<dyn BypassTransport>>,
    primary_failed: AtomicBool,
}

impl BypassPipeline {
    /// A pipeline with a single technique and no fallback.
    pub fn single(transport: Arc<dyn BypassTransport>) -> Self {
        Self {
            primary: transport,
            fallback: None,
            primary_failed: AtomicBool::new(false),
        }
    }

    /// A pipeline that falls back from `primary` to `fallback`.
    pub fn dual(primary: Arc<dyn BypassTransport>, fallback: Arc<dyn BypassTransport>) -> Self {
        Self {
            primary,
            fallback: Some(fallback),
            primary_failed: AtomicBool::new(false),
        }
    }

    /// Builds the script-backed pipeline for a bypass method.
    pub fn for_method(method: BypassMethod, interpreter: &str, helper_dir: &Path) -> Self {
        let transport = |technique: BypassTechnique| -> Arc<dyn BypassTransport> {
            match technique {
                BypassTechnique::Cloudscraper => {
                    Arc::new(CloudscraperTransport::new(interpreter, helper_dir))
                }
                BypassTechnique::CurlCffi => Arc::new(CurlCffiTransport::new(interpreter, helper_dir)),
            }
        };

        let primary = transport(method.primary());
        match method.fallback() {
            Some(fallback) => Self::dual(primary, transport(fallback)),
            None => Self::single(primary),
        }
    }

    /// Techniques in the order they are tried.
    pub fn techniques(&self) -> Vec<BypassTechnique> {
        std::iter::once(self.primary.technique())
            .chain(self.fallback.as_ref().map(|f| f.technique()))
            .collect()
    }

    /// Returns true once the primary has failed in dual mode.
    pub fn primary_failed(&self) -> bool {
        self.primary_failed.load(Ordering::SeqCst)
    }

    /// Executes one request.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn execute(&self, request: &BypassRequest) -> Result<BypassOutcome, FetchError> {
        let Some(fallback) = &self.fallback else {
            return attempt(self.primary.as_ref(), request).await;
        };

        if self.primary_failed() {
            debug!(technique = %fallback.technique(), "Primary bypass failed earlier, using fallback");
            return attempt(fallback.as_ref(), request).await;
        }

        let primary_err = match attempt(self.primary.as_ref(), request).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) if e.is_http_status() => return Err(e),
            Err(e) => e,
        };

        self.primary_failed.store(true, Ordering::SeqCst);
        warn!(
            primary = %self.primary.technique(),
            fallback = %fallback.technique(),
            error = %primary_err,
            "Primary bypass failed, switching to fallback for this client"
        );

        match attempt(fallback.as_ref(), request).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_http_status() => Err(e),
            Err(fallback_err) => Err(FetchError::BypassExhausted {
                primary_technique: self.primary.technique(),
                primary: Box::new(primary_err),
                fallback_technique: fallback.technique(),
                fallback: Box::new(fallback_err),
            }),
        }
    }
}

impl std::fmt::Debug for BypassPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BypassPipeline")
            .field("techniques", &self.techniques())
            .field("primary_failed", &self.primary_failed())
            .finish()
    }
}

/// Runs one technique and interprets its envelope.
async fn attempt(
    transport: &dyn BypassTransport,
    request: &BypassRequest,
) -> Result<BypassOutcome, FetchError> {
    let technique = transport.technique();
    let start = Instant::now();
    let response = transport.request(request).await?;

    if !response.success {
        return Err(BridgeError::HelperFailed {
            technique,
            error: response
                .error
                .unwrap_or_else(|| "unknown helper error".to_string()),
            error_type: response.error_type,
        }
        .into());
    }

    let status = response.status.unwrap_or(200);
    if status >= 400 {
        debug!(technique = %technique, status, "Bypass returned HTTP error status");
        let body = response.body.map(|body| match body {
            Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
            other => other,
        });
        return Err(HttpStatusError::new(status, body).into());
    }

    Ok(BypassOutcome {
        technique,
        response,
        duration: start.elapsed(),
    })
}

// ============================================================================
// Tests
// ============================================================================
