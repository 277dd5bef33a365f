// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # forumcp Store
//!
//! Process-wide state for the forumcp server.
//!
//! This crate provides:
//!
//! - **SiteState**: Routes site URLs to per-site clients and tracks the selected site
//! - **Profile**: JSON configuration with defaults, login merging and bypass switches
//! - **WriteRateLimiter**: Minimum spacing between writes of the same kind
//! - **Redaction**: Secret scrubbing for configuration logging
//!
//! ## Usage
//!
//! ```ignore
//! use forumcp_store::{Profile, SiteState};
//!
//! let profile = Profile::load(&path).await?;
//! let sites = SiteState::new(profile.site_options());
//!
//! let site = sites.select_site("https://meta.discourse.org")?;
//! let about = site.client.get("/about.json", None).await?;
//! ```

pub mod error;
pub mod persistence;
pub mod profile;
pub mod rate_limit;
pub mod redact;
pub mod site_state;

pub use error::StoreError;
pub use persistence::{default_config_dir, default_helper_dir, default_profile_path, load_json};
pub use profile::{
    ENV_PASSWORD, ENV_SECOND_FACTOR, ENV_USERNAME, LogLevel, Profile, parse_auth_pairs,
    resolve_login,
};
pub use rate_limit::{DEFAULT_WRITE_INTERVAL, WriteCategory, WriteRateLimiter};
pub use redact::{redact_secrets, redact_value};
pub use site_state::{SelectedSite, SiteOptions, SiteState};
