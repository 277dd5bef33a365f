//! Forum HTTP client.
//!
//! One client serves one site. It owns that site's cookie jar and response
//! cache and dispatches every request either directly (with retries) or
//! through the bypass pipeline.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use forumcp_core::{AuthMode, LoginCredentials};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, SET_COOKIE};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use crate::bypass::{BypassRequest, BypassResponse};
use crate::cache::TtlCache;
use crate::context::ForumClientBuilder;
use crate::cookie::CookieJar;
use crate::error::{FetchError, HttpStatusError};
use crate::headers::{HeaderBuilder, RequestHeaders};
use crate::pipeline::BypassPipeline;
use crate::retry::RetryPolicy;

// ============================================================================
// Payload
// ============================================================================

/// A response body: parsed JSON or raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// `application/json` response.
    Json(Value),
    /// Anything else.
    Text(String),
}

impl Payload {
    /// Returns the JSON value, if this is JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Converts to JSON; text becomes a JSON string.
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }

    /// Returns the raw text, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }
}

// ============================================================================
// Forum Client
// ============================================================================

/// HTTP client bound to one forum site.
#[derive(Debug)]
pub struct ForumClient {
    pub(crate) base: String,
    pub(crate) base_url: Url,
    pub(crate) http: reqwest::Client,
    pub(crate) headers: HeaderBuilder,
    pub(crate) cookies: CookieJar,
    pub(crate) cache: TtlCache<String, Payload>,
    pub(crate) bypass: Option<BypassPipeline>,
    pub(crate) retry: RetryPolicy,
    pub(crate) timeout: Duration,
    pub(crate) login: Option<LoginCredentials>,
    pub(crate) last_url: Mutex<Option<String>>,
}

impl ForumClient {
    /// Starts building a client for a site.
    pub fn builder(base_url: impl Into<String>) -> ForumClientBuilder {
        ForumClientBuilder::new(base_url)
    }

    /// Normalized site base, e.g. `https://forum.example`.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The auth mode attached to every request.
    pub fn auth(&self) -> &AuthMode {
        self.headers.auth()
    }

    /// The site's cookie jar.
    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// The bypass pipeline, when requests are routed through helpers.
    pub fn bypass(&self) -> Option<&BypassPipeline> {
        self.bypass.as_ref()
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// URL of the most recent completed request.
    pub fn last_url(&self) -> Option<String> {
        self.last_url
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resolves a path against the site base.
    pub fn resolve(&self, path: &str) -> Result<String, FetchError> {
        self.base_url
            .join(path)
            .map(String::from)
            .map_err(|e| FetchError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Headers the next request would carry.
    pub fn headers_for(&self, with_body: bool) -> RequestHeaders {
        self.headers
            .build(&self.cookies, self.last_url().is_some(), with_body)
    }

    /// GET a path.
    pub async fn get(
        &self,
        path: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Payload, FetchError> {
        let url = self.resolve(path)?;
        self.execute(Method::GET, url, None, cancel).await
    }

    /// GET a path, serving from the response cache while fresh.
    pub async fn get_cached(
        &self,
        path: &str,
        ttl: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<Payload, FetchError> {
        let url = self.resolve(path)?;
        if let Some(hit) = self.cache.get(&url) {
            debug!(url = %url, "Response cache hit");
            return Ok(hit);
        }

        let payload = self.execute(Method::GET, url.clone(), None, cancel).await?;
        self.cache.insert(url, payload.clone(), ttl);
        Ok(payload)
    }

    /// POST a JSON body to a path.
    pub async fn post(
        &self,
        path: &str,
        body: &Value,
        cancel: Option<&CancellationToken>,
    ) -> Result<Payload, FetchError> {
        let url = self.resolve(path)?;
        self.execute(Method::POST, url, Some(body), cancel).await
    }

    #[instrument(skip(self, body, cancel), fields(site = %self.base))]
    async fn execute(
        &self,
        method: Method,
        url: String,
        body: Option<&Value>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Payload, FetchError> {
        let body = body.map(serde_json::to_string).transpose()?;
        match &self.bypass {
            Some(pipeline) => {
                let work = self.via_bypass(pipeline, &method, &url, body);
                with_cancel(cancel, work).await
            }
            None => {
                let work = self.direct(&method, &url, body.as_deref());
                with_cancel(cancel, work).await
            }
        }
    }

    // ========================================================================
    // Direct path
    // ========================================================================

    async fn direct(&self, method: &Method, url: &str, body: Option<&str>) -> Result<Payload, FetchError> {
        let attempts = self
            .retry
            .run(move |attempt| self.send_once(method.clone(), url, body, attempt));

        match tokio::time::timeout(self.timeout, attempts).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                after: self.timeout,
            }),
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        attempt: u32,
    ) -> Result<Payload, FetchError> {
        let headers = self.headers_for(body.is_some()).to_header_map()?;
        debug!(method = %method, url = %url, attempt, "Sending request");

        let mut request = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e, self.timeout))?;

        for value in response.headers().get_all(SET_COOKIE) {
            if let Ok(value) = value.to_str() {
                self.cookies.absorb_set_cookie(value);
            }
        }
        self.mark_visited(url);

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e, self.timeout))?;

        debug!(status = status.as_u16(), len = text.len(), "Response received");

        if !status.is_success() {
            return Err(HttpStatusError::from_text(status.as_u16(), &text).into());
        }
        parse_body(content_type.as_deref(), text)
    }

    // ========================================================================
    // Bypass path
    // ========================================================================

    async fn via_bypass(
        &self,
        pipeline: &BypassPipeline,
        method: &Method,
        url: &str,
        body: Option<String>,
    ) -> Result<Payload, FetchError> {
        let request = BypassRequest {
            url: url.to_string(),
            method: method.as_str().to_string(),
            headers: self.headers_for(body.is_some()).to_map(),
            body,
            cookies: self.cookies.snapshot(),
            timeout: Some(envelope_timeout_secs(self.timeout)),
            login: self.login.clone(),
        };

        let outcome = pipeline.execute(&request).await?;
        debug!(
            technique = %outcome.technique,
            status = ?outcome.response.status,
            duration = ?outcome.duration,
            "Bypass request completed"
        );

        if let Some(cookies) = &outcome.response.cookies {
            self.cookies.merge_map(cookies);
        }
        if let Some(set_cookie) = outcome.response.header("set-cookie") {
            self.cookies.absorb_set_cookie(set_cookie);
        }
        self.mark_visited(url);

        envelope_payload(outcome.response)
    }

    fn mark_visited(&self, url: &str) {
        *self.last_url.lock().unwrap_or_else(PoisonError::into_inner) = Some(url.to_string());
    }
}

/// Runs `work`, aborting when the token fires.
async fn with_cancel<T>(
    cancel: Option<&CancellationToken>,
    work: impl Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                () = token.cancelled() => Err(FetchError::Cancelled),
                result = work => result,
            }
        }
        None => work.await,
    }
}

/// Whole seconds for the helper, rounded up.
fn envelope_timeout_secs(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis().div_ceil(1000))
        .unwrap_or(u64::MAX)
        .max(1)
}

fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
}

fn parse_body(content_type: Option<&str>, text: String) -> Result<Payload, FetchError> {
    if is_json_content_type(content_type) {
        return Ok(Payload::Json(serde_json::from_str(&text)?));
    }
    Ok(Payload::Text(text))
}

/// Body of a successful envelope. String bodies follow the upstream
/// content type; without one, they are parsed as JSON when they parse.
fn envelope_payload(response: BypassResponse) -> Result<Payload, FetchError> {
    let content_type = response.header("content-type").map(ToString::to_string);
    match response.body {
        None | Some(Value::Null) => Ok(Payload::Text(String::new())),
        Some(Value::String(text)) => match content_type {
            Some(ct) => parse_body(Some(&ct), text),
            None => Ok(serde_json::from_str(&text).map_or(Payload::Text(text), Payload::Json)),
        },
        Some(other) => Ok(Payload::Json(other)),
    }
}
