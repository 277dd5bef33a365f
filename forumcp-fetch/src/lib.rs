// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # forumcp Fetch
//!
//! HTTP access layer for a single forum site.
//!
//! ## Client
//!
//! - [`client::ForumClient`] - `get`, `get_cached` and `post` against one site
//! - [`context::ForumClientBuilder`] - Timeout, auth, cookies, bypass and retry settings
//! - [`retry::RetryPolicy`] - Exponential backoff for 429 and 5xx responses
//! - [`cookie::CookieJar`] and [`headers::HeaderBuilder`] - Per-site request state
//! - [`cache::TtlCache`] - Lazily expiring keyed cache
//!
//! ## Cloudflare Bypass
//!
//! Requests can be routed through external helper processes instead of
//! being sent directly:
//!
//! - [`bypass::BypassTransport`] - One technique, one request per call
//! - [`bypass::ScriptBridge`] - JSON envelope over a helper's stdin/stdout
//! - [`pipeline::BypassPipeline`] - Primary/fallback routing with a sticky failure flag
//!
//! ## Example
//!
//! ```ignore
//! use forumcp_fetch::ForumClient;
//!
//! let client = ForumClient::builder("https://meta.discourse.org").build()?;
//! let latest = client.get("/latest.json", None).await?;
//! ```

pub mod bypass;
pub mod cache;
pub mod client;
pub mod context;
pub mod cookie;
pub mod error;
pub mod headers;
pub mod host;
pub mod pipeline;
pub mod retry;

// Errors
pub use error::{BridgeError, ConnectFailure, FetchError, HttpStatusError, ProcessError};

// Client
pub use cache::{DEFAULT_MAX_ENTRIES, TtlCache};
pub use client::{ForumClient, Payload};
pub use context::{DEFAULT_TIMEOUT, ForumClientBuilder, default_interpreter};
pub use cookie::CookieJar;
pub use headers::{HeaderBuilder, RequestHeaders};
pub use retry::RetryPolicy;

// Bypass
pub use bypass::{
    BypassRequest, BypassResponse, BypassTransport, CloudscraperTransport, CurlCffiTransport,
    ScriptBridge,
};
pub use pipeline::{BypassOutcome, BypassPipeline};

// Host APIs
pub use host::{ProcessOutput, ProcessRunner};
