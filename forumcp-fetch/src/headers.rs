//! Outgoing request headers.

use std::collections::HashMap;

use forumcp_core::AuthMode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::cookie::CookieJar;
use crate::error::FetchError;

/// Desktop Chrome on Windows.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8",
    ),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("Accept-Language", "en-US,en;q=0.9"),
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    ),
    (
        "Sec-Ch-Ua",
        "\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\"",
    ),
    ("Sec-Ch-Ua-Mobile", "?0"),
    ("Sec-Ch-Ua-Platform", "\"Windows\""),
    ("Sec-Fetch-Dest", "empty"),
    ("Sec-Fetch-Mode", "cors"),
    ("Sec-Fetch-Site", "same-origin"),
    ("Upgrade-Insecure-Requests", "1"),
];

// ============================================================================
// Request Headers
// ============================================================================

/// Ordered header list for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders(Vec<(String, String)>);

impl RequestHeaders {
    /// Appends a header.
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.0.push((name.to_string(), value.into()));
    }

    /// Returns the first value for a header (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if the header is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over name/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Converts to a reqwest header map.
    pub fn to_header_map(&self) -> Result<HeaderMap, FetchError> {
        let mut map = HeaderMap::with_capacity(self.0.len());
        for (name, value) in &self.0 {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| FetchError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| FetchError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }

    /// Converts to a plain map for the bypass envelope.
    pub fn to_map(&self) -> HashMap<String, String> {
        self.0.iter().cloned().collect()
    }
}

// ============================================================================
// Header Builder
// ============================================================================

/// Builds headers for one site.
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    auth: AuthMode,
    referer: String,
}

impl HeaderBuilder {
    /// Creates a builder. `referer` is sent once a prior request completed.
    pub fn new(auth: AuthMode, referer: impl Into<String>) -> Self {
        Self {
            auth,
            referer: referer.into(),
        }
    }

    /// The auth mode this builder attaches.
    pub fn auth(&self) -> &AuthMode {
        &self.auth
    }

    /// Builds the header set for a request.
    pub fn build(&self, jar: &CookieJar, has_prior_request: bool, with_body: bool) -> RequestHeaders {
        let mut headers = RequestHeaders::default();
        for (name, value) in BROWSER_HEADERS {
            headers.push(name, *value);
        }

        if has_prior_request {
            headers.push("Referer", self.referer.clone());
        }
        if let Some(cookie) = jar.to_header() {
            headers.push("Cookie", cookie);
        }

        match &self.auth {
            AuthMode::None => {}
            AuthMode::ApiKey { key, username } => {
                headers.push("Api-Key", key.clone());
                if let Some(username) = username {
                    headers.push("Api-Username", username.clone());
                }
            }
            AuthMode::UserApiKey { key, client_id } => {
                headers.push("User-Api-Key", key.clone());
                if let Some(client_id) = client_id {
                    headers.push("User-Api-Client-Id", client_id.clone());
                }
            }
        }

        if with_body {
            headers.push("Content-Type", "application/json");
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_has_no_referer_or_cookie() {
        let builder = HeaderBuilder::new(AuthMode::None, "https://a.example/");
        let headers = builder.build(&CookieJar::new(), false, false);

        assert!(headers.contains("User-Agent"));
        assert!(headers.get("Sec-Ch-Ua-Platform").is_some());
        assert!(!headers.contains("Referer"));
        assert!(!headers.contains("Cookie"));
        assert!(!headers.contains("Content-Type"));
    }

    #[test]
    fn test_referer_is_fixed_site_url() {
        let builder = HeaderBuilder::new(AuthMode::None, "https://a.example/");
        let headers = builder.build(&CookieJar::from_cookie_string("a=1; b=2"), true, true);

        assert_eq!(headers.get("referer"), Some("https://a.example/"));
        assert_eq!(headers.get("Cookie"), Some("a=1; b=2"));
        assert_eq!(headers.get("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_exactly_one_auth_family() {
        let builder = HeaderBuilder::new(
            AuthMode::UserApiKey {
                key: "uk".into(),
                client_id: Some("cid".into()),
            },
            "https://a.example/",
        );
        let headers = builder.build(&CookieJar::new(), false, false);
        assert_eq!(headers.get("User-Api-Key"), Some("uk"));
        assert_eq!(headers.get("User-Api-Client-Id"), Some("cid"));
        assert!(!headers.contains("Api-Key"));
        assert!(!headers.contains("Api-Username"));

        let builder = HeaderBuilder::new(
            AuthMode::ApiKey {
                key: "ak".into(),
                username: Some("system".into()),
            },
            "https://a.example/",
        );
        let headers = builder.build(&CookieJar::new(), false, false);
        assert_eq!(headers.get("Api-Key"), Some("ak"));
        assert_eq!(headers.get("Api-Username"), Some("system"));
        assert!(!headers.contains("User-Api-Key"));
    }

    #[test]
    fn test_to_header_map() {
        let builder = HeaderBuilder::new(AuthMode::None, "https://a.example/");
        let map = builder
            .build(&CookieJar::from_cookie_string("a=1"), true, false)
            .to_header_map()
            .unwrap();

        assert_eq!(map.get("cookie").unwrap(), "a=1");
        assert_eq!(map.get("accept-encoding").unwrap(), "gzip, deflate, br");
    }
}
