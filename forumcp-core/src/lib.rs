// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # forumcp Core
//!
//! Core types shared by every forumcp crate.
//!
//! ## Key Types
//!
//! ### Authentication
//! - [`AuthMode`] - Exactly one auth scheme per client (none, API key, user API key)
//! - [`AuthOverride`] - Per-site credentials, cookies and login
//! - [`LoginCredentials`] - Username/password forwarded to bypass helpers
//!
//! ### Site Identity
//! - [`normalize_base`] - Reduces any site URL to its origin + root form
//! - [`same_origin`] - Scheme/host/port comparison
//!
//! ### Bypass Selection
//! - [`BypassMethod`] - Configured routing (`cloudscraper`, `curl_cffi`, `both`)
//! - [`BypassTechnique`] - One concrete helper

pub mod error;
pub mod models;

pub use error::CoreError;

pub use models::{
    // Auth
    AuthMode,
    AuthOverride,
    LoginCredentials,
    find_override,
    // Bypass
    BypassMethod,
    BypassTechnique,
    // Site identity
    normalize_base,
    same_origin,
};
