//! Multi-site router.
//!
//! Maps a site URL to the one [`ForumClient`] serving that site and tracks
//! which site is currently selected. Clients are built lazily, cached by
//! normalized base, and never evicted.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use forumcp_core::{AuthMode, AuthOverride, BypassMethod, find_override, normalize_base};
use forumcp_fetch::{DEFAULT_TIMEOUT, ForumClient, RetryPolicy, default_interpreter};
use tracing::{debug, info, instrument};

use crate::error::StoreError;

// ============================================================================
// Site Options
// ============================================================================

/// Settings applied to every client the router builds.
#[derive(Debug, Clone)]
pub struct SiteOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Auth used when no override matches a site.
    pub default_auth: AuthMode,
    /// Per-site credentials and cookies, first match wins.
    pub overrides: Vec<AuthOverride>,
    /// Bypass routing, or `None` for direct requests.
    pub bypass: Option<BypassMethod>,
    /// Interpreter for bypass helpers.
    pub interpreter: String,
    /// Directory holding bypass helper scripts.
    pub helper_dir: PathBuf,
    /// Retry policy for direct requests.
    pub retry: RetryPolicy,
}

impl Default for SiteOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            default_auth: AuthMode::None,
            overrides: Vec::new(),
            bypass: None,
            interpreter: default_interpreter().to_string(),
            helper_dir: PathBuf::from("helpers"),
            retry: RetryPolicy::default(),
        }
    }
}

// ============================================================================
// Selected Site
// ============================================================================

/// A normalized site base and its client.
#[derive(Debug, Clone)]
pub struct SelectedSite {
    /// Normalized base, e.g. `https://forum.example`.
    pub base: String,
    /// The client for that base.
    pub client: Arc<ForumClient>,
}

// ============================================================================
// Site State
// ============================================================================

/// Router from site URLs to clients.
#[derive(Debug)]
pub struct SiteState {
    options: SiteOptions,
    clients: Mutex<HashMap<String, Arc<ForumClient>>>,
    selected: RwLock<Option<SelectedSite>>,
}

impl SiteState {
    /// Creates a router with no site selected.
    pub fn new(options: SiteOptions) -> Self {
        Self {
            options,
            clients: Mutex::new(HashMap::new()),
            selected: RwLock::new(None),
        }
    }

    /// Router settings.
    pub fn options(&self) -> &SiteOptions {
        &self.options
    }

    /// Returns the cached client for a site, building it on first use.
    ///
    /// Does not change the selected site.
    #[instrument(skip(self))]
    pub fn build_client_for_site(&self, url: &str) -> Result<SelectedSite, StoreError> {
        let base = normalize_base(url)?;

        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(&base) {
            return Ok(SelectedSite {
                base,
                client: Arc::clone(client),
            });
        }

        let entry = find_override(&self.options.overrides, &base);
        let auth = entry
            .and_then(AuthOverride::auth_mode)
            .unwrap_or_else(|| self.options.default_auth.clone());
        debug!(
            site = %base,
            auth = auth.label(),
            matched_override = entry.is_some(),
            "Building client for site"
        );

        let client = ForumClient::builder(base.clone())
            .timeout(self.options.timeout)
            .auth(auth)
            .cookies(entry.and_then(|e| e.cookies.clone()))
            .login(entry.and_then(AuthOverride::login))
            .bypass(self.options.bypass)
            .interpreter(self.options.interpreter.clone())
            .helper_dir(self.options.helper_dir.clone())
            .retry(self.options.retry.clone())
            .build()?;

        let client = Arc::new(client);
        clients.insert(base.clone(), Arc::clone(&client));
        Ok(SelectedSite { base, client })
    }

    /// Selects a site, building its client if needed.
    pub fn select_site(&self, url: &str) -> Result<SelectedSite, StoreError> {
        let site = self.build_client_for_site(url)?;
        *self.selected.write().unwrap_or_else(PoisonError::into_inner) = Some(site.clone());
        info!(site = %site.base, "Selected site");
        Ok(site)
    }

    /// Returns the selected site or [`StoreError::NoSiteSelected`].
    pub fn ensure_selected_site(&self) -> Result<SelectedSite, StoreError> {
        self.selected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(StoreError::NoSiteSelected)
    }

    /// Client for an explicitly named site, else the selected one.
    pub fn client_for(&self, site: Option<&str>) -> Result<SelectedSite, StoreError> {
        match site {
            Some(url) => self.build_client_for_site(url),
            None => self.ensure_selected_site(),
        }
    }

    /// Base of the selected site.
    pub fn site_base(&self) -> Option<String> {
        self.selected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.base.clone())
    }

    /// Number of cached clients.
    pub fn client_count(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(overrides: Vec<AuthOverride>) -> SiteState {
        SiteState::new(SiteOptions {
            overrides,
            ..SiteOptions::default()
        })
    }

    #[test]
    fn test_same_base_same_client() {
        let state = state_with(vec![]);

        let a = state.build_client_for_site("https://a.example/x").unwrap();
        let b = state.build_client_for_site("https://a.example/y").unwrap();

        assert_eq!(a.base, "https://a.example");
        assert!(Arc::ptr_eq(&a.client, &b.client));
        assert_eq!(state.client_count(), 1);
    }

    #[test]
    fn test_no_site_selected() {
        let state = state_with(vec![]);

        assert!(matches!(
            state.ensure_selected_site(),
            Err(StoreError::NoSiteSelected)
        ));

        // Building does not select.
        state.build_client_for_site("https://a.example").unwrap();
        assert!(state.ensure_selected_site().is_err());
        assert!(state.site_base().is_none());
    }

    #[test]
    fn test_select_switches_without_teardown() {
        let state = state_with(vec![]);

        let a = state.select_site("https://a.example").unwrap();
        state.select_site("https://b.example/latest").unwrap();
        assert_eq!(state.site_base().as_deref(), Some("https://b.example"));

        let again = state.select_site("https://a.example/t/1").unwrap();
        assert!(Arc::ptr_eq(&a.client, &again.client));
        assert_eq!(state.client_count(), 2);
    }

    #[test]
    fn test_user_api_key_override_applies() {
        let state = state_with(vec![AuthOverride {
            user_api_key: Some("uk".into()),
            ..AuthOverride::for_site("https://a.example")
        }]);

        let site = state.build_client_for_site("https://a.example/anything").unwrap();
        let headers = site.client.headers_for(false);

        assert_eq!(headers.get("User-Api-Key"), Some("uk"));
        assert!(!headers.contains("Api-Key"));
    }

    #[test]
    fn test_override_cookies_seed_jar() {
        let state = state_with(vec![AuthOverride {
            cookies: Some("_t=abc; _forum_session=def".into()),
            ..AuthOverride::for_site("https://a.example")
        }]);

        let site = state.build_client_for_site("https://a.example").unwrap();
        assert_eq!(site.client.cookies().get("_t").as_deref(), Some("abc"));

        let other = state.build_client_for_site("https://b.example").unwrap();
        assert!(other.client.cookies().is_empty());
        assert_eq!(other.client.auth(), &AuthMode::None);
    }

    #[test]
    fn test_invalid_site_rejected() {
        let state = state_with(vec![]);
        assert!(matches!(
            state.select_site("not a url"),
            Err(StoreError::InvalidSite(_))
        ));
        assert!(state.site_base().is_none());
    }

    #[test]
    fn test_client_for_prefers_explicit_site() {
        let state = state_with(vec![]);
        state.select_site("https://a.example").unwrap();

        assert_eq!(state.client_for(None).unwrap().base, "https://a.example");
        assert_eq!(
            state.client_for(Some("https://b.example/x")).unwrap().base,
            "https://b.example"
        );
        assert_eq!(state.site_base().as_deref(), Some("https://a.example"));
    }
}
