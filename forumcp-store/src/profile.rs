//! Profile configuration.
//!
//! A profile is a JSON file; command-line flags and environment variables
//! are layered over it by the binary.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use forumcp_core::{AuthMode, AuthOverride, BypassMethod, LoginCredentials, normalize_base};
use forumcp_fetch::{RetryPolicy, default_interpreter};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::persistence::{default_helper_dir, load_json};
use crate::site_state::SiteOptions;

/// Environment variable holding the login name.
pub const ENV_USERNAME: &str = "FORUMCP_USERNAME";
/// Environment variable holding the login password.
pub const ENV_PASSWORD: &str = "FORUMCP_PASSWORD";
/// Environment variable holding the 2FA token.
pub const ENV_SECOND_FACTOR: &str = "FORUMCP_2FA_TOKEN";

// ============================================================================
// Log Level
// ============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// No logging.
    Silent,
    /// Error level logging.
    Error,
    /// Info level logging.
    #[default]
    Info,
    /// Debug level logging.
    Debug,
}

impl LogLevel {
    /// `EnvFilter` directive for this level.
    pub fn filter_directive(self) -> &'static str {
        match self {
            LogLevel::Silent => "off",
            LogLevel::Error => "error",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Silent => write!(f, "silent"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silent" => Ok(LogLevel::Silent),
            "error" => Ok(LogLevel::Error),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(StoreError::Config(format!(
                "unknown log level '{other}' (expected silent, error, info or debug)"
            ))),
        }
    }
}

// ============================================================================
// Profile
// ============================================================================

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Profile {
    /// Per-site credentials. Accepts a list or a JSON string of a list.
    #[serde(deserialize_with = "auth_pairs_list_or_json")]
    pub auth_pairs: Vec<AuthOverride>,
    /// Refuse writes regardless of `allow_writes`.
    pub read_only: bool,
    /// Register write tools (also needs `read_only: false` and credentials).
    pub allow_writes: bool,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Log level.
    pub log_level: LogLevel,
    /// Site to tether to at startup.
    pub site: Option<String>,
    /// Prefix prepended to every search query.
    pub default_search: Option<String>,
    /// Truncate post content beyond this many characters.
    pub max_read_length: usize,
    /// Cloudflare bypass routing.
    pub bypass_method: BypassMethod,
    /// Legacy switch; `true` means `bypass_method: both`.
    pub use_cloudscraper: Option<bool>,
    /// Send requests directly, never through bypass helpers.
    pub no_bypass: bool,
    /// Python interpreter for bypass helpers.
    pub python_path: Option<String>,
    /// Directory holding the bypass helper scripts.
    pub helper_dir: Option<PathBuf>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            auth_pairs: Vec::new(),
            read_only: true,
            allow_writes: false,
            timeout_ms: 15_000,
            log_level: LogLevel::default(),
            site: None,
            default_search: None,
            max_read_length: 50_000,
            bypass_method: BypassMethod::default(),
            use_cloudscraper: None,
            no_bypass: false,
            python_path: None,
            helper_dir: None,
        }
    }
}

impl Profile {
    /// Loads a profile from a JSON file.
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        let profile: Profile = load_json(path).await.map_err(|e| match e {
            StoreError::Serialization(e) => {
                StoreError::Config(format!("invalid profile {}: {e}", path.display()))
            }
            other => other,
        })?;
        debug!(path = %path.display(), sites = profile.auth_pairs.len(), "Profile loaded");
        Ok(profile)
    }

    /// Bypass routing after legacy and disable switches.
    pub fn effective_bypass(&self) -> Option<BypassMethod> {
        if self.no_bypass {
            None
        } else if self.use_cloudscraper == Some(true) {
            Some(BypassMethod::Both)
        } else {
            Some(self.bypass_method)
        }
    }

    /// Write tools are enabled only with credentials, `allow_writes` and not `read_only`.
    pub fn writes_allowed(&self) -> bool {
        self.allow_writes && !self.read_only && !self.auth_pairs.is_empty()
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Interpreter for bypass helpers.
    pub fn interpreter(&self) -> String {
        self.python_path
            .clone()
            .unwrap_or_else(|| default_interpreter().to_string())
    }

    /// Merges login credentials into the `auth_pairs` entry for `site`.
    ///
    /// An existing entry for the same site keeps its keys and cookies and
    /// gets the new login fields; otherwise a new entry is appended.
    pub fn merge_login(&mut self, site: &str, login: LoginCredentials) {
        let base = normalize_base(site).ok();
        let existing = self.auth_pairs.iter().position(|entry| {
            entry.site == site || base.as_deref().is_some_and(|b| entry.matches_exact(b))
        });

        let idx = existing.unwrap_or_else(|| {
            self.auth_pairs.push(AuthOverride::for_site(site));
            self.auth_pairs.len() - 1
        });
        let entry = &mut self.auth_pairs[idx];
        entry.username = Some(login.username);
        entry.password = Some(login.password);
        if login.second_factor_token.is_some() {
            entry.second_factor_token = login.second_factor_token;
        }
    }

    /// Router settings derived from this profile.
    pub fn site_options(&self) -> SiteOptions {
        SiteOptions {
            timeout: self.timeout(),
            default_auth: AuthMode::None,
            overrides: self.auth_pairs.clone(),
            bypass: self.effective_bypass(),
            interpreter: self.interpreter(),
            helper_dir: self.helper_dir.clone().unwrap_or_else(default_helper_dir),
            retry: RetryPolicy::default(),
        }
    }
}

/// Login credentials from explicit values, falling back to the environment.
///
/// Both a username and a password are required.
pub fn resolve_login(
    username: Option<String>,
    password: Option<String>,
    second_factor_token: Option<String>,
    env: impl Fn(&str) -> Option<String>,
) -> Option<LoginCredentials> {
    let username = username.or_else(|| env(ENV_USERNAME))?;
    let password = password.or_else(|| env(ENV_PASSWORD))?;
    Some(LoginCredentials {
        username,
        password,
        second_factor_token: second_factor_token.or_else(|| env(ENV_SECOND_FACTOR)),
    })
}

/// Parses `auth_pairs` given as a JSON string.
pub fn parse_auth_pairs(json: &str) -> Result<Vec<AuthOverride>, StoreError> {
    serde_json::from_str(json).map_err(|e| StoreError::Config(format!("invalid auth_pairs: {e}")))
}

fn auth_pairs_list_or_json<'de, D>(deserializer: D) -> Result<Vec<AuthOverride>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrJson {
        List(Vec<AuthOverride>),
        Json(String),
    }

    match ListOrJson::deserialize(deserializer)? {
        ListOrJson::List(list) => Ok(list),
        ListOrJson::Json(text) => parse_auth_pairs(&text).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn login(user: &str) -> LoginCredentials {
        LoginCredentials {
            username: user.into(),
            password: "pw".into(),
            second_factor_token: None,
        }
    }

    #[test]
    fn test_defaults() {
        let profile: Profile = serde_json::from_str("{}").unwrap();

        assert!(profile.read_only);
        assert!(!profile.allow_writes);
        assert_eq!(profile.timeout(), Duration::from_secs(15));
        assert_eq!(profile.max_read_length, 50_000);
        assert_eq!(profile.effective_bypass(), Some(BypassMethod::Both));
        assert!(!profile.writes_allowed());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_json::from_str::<Profile>(r#"{"read_onyl": false}"#).is_err());
    }

    #[test]
    fn test_auth_pairs_as_json_string() {
        let profile: Profile = serde_json::from_str(
            r#"{"auth_pairs": "[{\"site\": \"https://a.example\", \"api_key\": \"k\"}]"}"#,
        )
        .unwrap();

        assert_eq!(profile.auth_pairs.len(), 1);
        assert_eq!(profile.auth_pairs[0].api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_bypass_switches() {
        let mut profile = Profile {
            bypass_method: BypassMethod::CurlCffi,
            ..Profile::default()
        };
        assert_eq!(profile.effective_bypass(), Some(BypassMethod::CurlCffi));

        profile.use_cloudscraper = Some(true);
        assert_eq!(profile.effective_bypass(), Some(BypassMethod::Both));

        profile.no_bypass = true;
        assert_eq!(profile.effective_bypass(), None);
    }

    #[test]
    fn test_writes_need_credentials() {
        let mut profile = Profile {
            allow_writes: true,
            read_only: false,
            ..Profile::default()
        };
        assert!(!profile.writes_allowed());

        profile.auth_pairs.push(AuthOverride {
            api_key: Some("k".into()),
            ..AuthOverride::for_site("https://a.example")
        });
        assert!(profile.writes_allowed());

        profile.read_only = true;
        assert!(!profile.writes_allowed());
    }

    #[test]
    fn test_merge_login_updates_existing_entry() {
        let mut profile = Profile {
            auth_pairs: vec![AuthOverride {
                user_api_key: Some("uk".into()),
                ..AuthOverride::for_site("https://a.example/")
            }],
            ..Profile::default()
        };

        profile.merge_login("https://a.example", login("alice"));

        assert_eq!(profile.auth_pairs.len(), 1);
        assert_eq!(profile.auth_pairs[0].username.as_deref(), Some("alice"));
        assert_eq!(profile.auth_pairs[0].user_api_key.as_deref(), Some("uk"));
    }

    #[test]
    fn test_merge_login_appends_for_new_site() {
        let mut profile = Profile::default();
        profile.merge_login("https://b.example", login("bob"));

        assert_eq!(profile.auth_pairs.len(), 1);
        assert_eq!(profile.auth_pairs[0].site, "https://b.example");
        assert!(profile.auth_pairs[0].login().is_some());
    }

    #[test]
    fn test_resolve_login_from_env() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_USERNAME, "env-user"),
            (ENV_PASSWORD, "env-pass"),
            (ENV_SECOND_FACTOR, "123456"),
        ]);
        let lookup = |key: &str| env.get(key).map(|v| (*v).to_string());

        let login = resolve_login(Some("flag-user".into()), None, None, lookup).unwrap();
        assert_eq!(login.username, "flag-user");
        assert_eq!(login.password, "env-pass");
        assert_eq!(login.second_factor_token.as_deref(), Some("123456"));

        assert!(resolve_login(None, None, None, |_| None).is_none());
    }

    #[tokio::test]
    async fn test_load_reports_invalid_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        tokio::fs::write(&path, r#"{"timeout_ms": "soon"}"#).await.unwrap();

        let err = Profile::load(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
