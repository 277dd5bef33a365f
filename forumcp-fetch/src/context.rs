//! Client construction.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use forumcp_core::{AuthMode, BypassMethod, LoginCredentials, normalize_base};
use tracing::debug;
use url::Url;

use crate::cache::TtlCache;
use crate::client::ForumClient;
use crate::cookie::CookieJar;
use crate::error::FetchError;
use crate::headers::HeaderBuilder;
use crate::pipeline::BypassPipeline;
use crate::retry::RetryPolicy;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Default Python interpreter for bypass helpers.
pub fn default_interpreter() -> &'static str {
    if cfg!(windows) { "python" } else { "python3" }
}

/// Builder for [`ForumClient`].
#[derive(Debug)]
pub struct ForumClientBuilder {
    base_url: String,
    timeout: Duration,
    auth: AuthMode,
    cookies: Option<String>,
    bypass: Option<BypassMethod>,
    interpreter: String,
    helper_dir: PathBuf,
    login: Option<LoginCredentials>,
    retry: RetryPolicy,
    pipeline: Option<BypassPipeline>,
}

impl ForumClientBuilder {
    /// Creates a builder for a site URL (normalized on build).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            auth: AuthMode::None,
            cookies: None,
            bypass: None,
            interpreter: default_interpreter().to_string(),
            helper_dir: PathBuf::from("helpers"),
            login: None,
            retry: RetryPolicy::default(),
            pipeline: None,
        }
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the auth mode.
    pub fn auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }

    /// Seeds the cookie jar from `name1=value1; name2=value2`.
    pub fn cookies(mut self, cookies: Option<String>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Routes requests through bypass helpers.
    pub fn bypass(mut self, method: Option<BypassMethod>) -> Self {
        self.bypass = method;
        self
    }

    /// Sets the interpreter used to run helper scripts.
    pub fn interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Sets the directory holding helper scripts.
    pub fn helper_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.helper_dir = dir.into();
        self
    }

    /// Login credentials forwarded to helpers that can log in.
    pub fn login(mut self, login: Option<LoginCredentials>) -> Self {
        self.login = login;
        self
    }

    /// Sets the retry policy for direct requests.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Uses a prebuilt bypass pipeline instead of script helpers.
    pub fn pipeline(mut self, pipeline: BypassPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<ForumClient, FetchError> {
        let base = normalize_base(&self.base_url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        let base_url = Url::parse(&base).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let http = reqwest::Client::builder()
            .connect_timeout(self.timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        let cookies = self
            .cookies
            .as_deref()
            .map(CookieJar::from_cookie_string)
            .unwrap_or_default();

        let bypass = self.pipeline.or_else(|| {
            self.bypass
                .map(|method| BypassPipeline::for_method(method, &self.interpreter, &self.helper_dir))
        });

        debug!(
            site = %base,
            auth = self.auth.label(),
            bypass = ?bypass.as_ref().map(BypassPipeline::techniques),
            cookies = !cookies.is_empty(),
            "Building forum client"
        );

        Ok(ForumClient {
            headers: HeaderBuilder::new(self.auth, format!("{base}/")),
            base,
            base_url,
            http,
            cookies,
            cache: TtlCache::unbounded(),
            bypass,
            retry: self.retry,
            timeout: self.timeout,
            login: self.login,
            last_url: Mutex::new(None),
        })
    }
}
