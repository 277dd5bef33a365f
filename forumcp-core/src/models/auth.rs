//! Authentication models.
//!
//! A client authenticates against exactly one site with exactly one
//! [`AuthMode`]. Per-site credentials come from [`AuthOverride`] entries,
//! which are matched against a normalized site base by the site router.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::site::{normalize_base, same_origin};

// ============================================================================
// Auth Mode
// ============================================================================

/// How requests to a site are authenticated.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthMode {
    /// Anonymous access.
    #[default]
    None,
    /// Admin API key, optionally acting as a specific user.
    ApiKey {
        /// The API key.
        key: String,
        /// Username sent as `Api-Username`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
    /// Per-user API key.
    UserApiKey {
        /// The user API key.
        key: String,
        /// Client id sent as `User-Api-Client-Id`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },
}

impl AuthMode {
    /// Short label for logs (never includes the key).
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ApiKey { .. } => "api_key",
            Self::UserApiKey { .. } => "user_api_key",
        }
    }

    /// Returns true if this mode sends credentials.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "AuthMode::None"),
            Self::ApiKey { username, .. } => f
                .debug_struct("AuthMode::ApiKey")
                .field("key", &"<redacted>")
                .field("username", username)
                .finish(),
            Self::UserApiKey { client_id, .. } => f
                .debug_struct("AuthMode::UserApiKey")
                .field("key", &"<redacted>")
                .field("client_id", client_id)
                .finish(),
        }
    }
}

// ============================================================================
// Login Credentials
// ============================================================================

/// Username/password login, forwarded to bypass helpers that can log in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    /// Login name or email.
    pub username: String,
    /// Password.
    pub password: String,
    /// Optional TOTP/2FA token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_factor_token: Option<String>,
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field(
                "second_factor_token",
                &self.second_factor_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

// ============================================================================
// Auth Override
// ============================================================================

/// Per-site credentials and cookies.
///
/// `site` is matched against a normalized base: an exact base match wins,
/// otherwise any entry on the same origin (scheme + host + port).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthOverride {
    /// Site URL this entry applies to.
    pub site: String,
    /// Admin API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Username for the admin API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_username: Option<String>,
    /// User API key (preferred over `api_key` when both are set).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_api_key: Option<String>,
    /// Client id for the user API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_api_client_id: Option<String>,
    /// Initial cookies, `name1=value1; name2=value2`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<String>,
    /// Login name for helper-driven login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password for helper-driven login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// 2FA token for helper-driven login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_factor_token: Option<String>,
}

impl AuthOverride {
    /// Creates an empty override for a site.
    pub fn for_site(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            ..Default::default()
        }
    }

    /// The auth mode this entry implies, if it carries a key.
    pub fn auth_mode(&self) -> Option<AuthMode> {
        if let Some(key) = &self.user_api_key {
            return Some(AuthMode::UserApiKey {
                key: key.clone(),
                client_id: self.user_api_client_id.clone(),
            });
        }
        self.api_key.as_ref().map(|key| AuthMode::ApiKey {
            key: key.clone(),
            username: self.api_username.clone(),
        })
    }

    /// Login credentials, when both username and password are present.
    pub fn login(&self) -> Option<LoginCredentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(LoginCredentials {
                username: username.clone(),
                password: password.clone(),
                second_factor_token: self.second_factor_token.clone(),
            }),
            _ => None,
        }
    }

    /// Returns true if this entry's site normalizes to exactly `base`.
    pub fn matches_exact(&self, base: &str) -> bool {
        normalize_base(&self.site).is_ok_and(|b| b == base)
    }

    /// Returns true if this entry's site shares an origin with `base`.
    pub fn matches_origin(&self, base: &str) -> bool {
        same_origin(&self.site, base)
    }
}

/// Finds the override that applies to a normalized base.
///
/// The first exact base match wins; otherwise the first same-origin entry.
pub fn find_override<'a>(overrides: &'a [AuthOverride], base: &str) -> Option<&'a AuthOverride> {
    overrides
        .iter()
        .find(|o| o.matches_exact(base))
        .or_else(|| overrides.iter().find(|o| o.matches_origin(base)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_api_key_preferred() {
        let entry = AuthOverride {
            api_key: Some("admin".into()),
            user_api_key: Some("user".into()),
            user_api_client_id: Some("cid".into()),
            ..AuthOverride::for_site("https://a.example")
        };

        assert_eq!(
            entry.auth_mode(),
            Some(AuthMode::UserApiKey {
                key: "user".into(),
                client_id: Some("cid".into()),
            })
        );
    }

    #[test]
    fn test_api_key_with_username() {
        let entry = AuthOverride {
            api_key: Some("k".into()),
            api_username: Some("system".into()),
            ..AuthOverride::for_site("https://a.example")
        };

        assert_eq!(
            entry.auth_mode(),
            Some(AuthMode::ApiKey {
                key: "k".into(),
                username: Some("system".into()),
            })
        );
    }

    #[test]
    fn test_login_requires_both_fields() {
        let mut entry = AuthOverride::for_site("https://a.example");
        entry.username = Some("alice".into());
        assert!(entry.login().is_none());

        entry.password = Some("hunter2".into());
        let login = entry.login().unwrap();
        assert_eq!(login.username, "alice");
        assert!(login.second_factor_token.is_none());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let mode = AuthMode::ApiKey {
            key: "super-secret".into(),
            username: None,
        };
        let rendered = format!("{mode:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_find_override_by_site() {
        let overrides = vec![
            AuthOverride {
                api_key: Some("plain-http".into()),
                ..AuthOverride::for_site("http://a.example")
            },
            AuthOverride {
                api_key: Some("other".into()),
                ..AuthOverride::for_site("https://b.example")
            },
            AuthOverride {
                api_key: Some("secure".into()),
                ..AuthOverride::for_site("https://a.example/forum/latest")
            },
        ];

        let found = find_override(&overrides, "https://a.example").unwrap();
        assert_eq!(found.api_key.as_deref(), Some("secure"));
        assert!(find_override(&overrides, "https://c.example").is_none());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let json = r#"{"site": "https://a.example", "apikey": "typo"}"#;
        assert!(serde_json::from_str::<AuthOverride>(json).is_err());
    }

    #[test]
    fn test_auth_mode_tagged_serde() {
        let mode: AuthMode =
            serde_json::from_str(r#"{"type": "user_api_key", "key": "abc"}"#).unwrap();
        assert_eq!(
            mode,
            AuthMode::UserApiKey {
                key: "abc".into(),
                client_id: None,
            }
        );
    }
}
