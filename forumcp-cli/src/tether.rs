//! Startup site tethering.

use anyhow::{Context, Result};
use forumcp_store::SiteState;
use serde_json::Value;
use tracing::info;

/// A site validated and selected at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tethered {
    /// Normalized base.
    pub base: String,
    /// Site title from `/about.json`, else the base.
    pub title: String,
}

/// Title from an `/about.json` document.
pub fn about_title(about: &Value) -> Option<&str> {
    about
        .pointer("/about/title")
        .or_else(|| about.get("title"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
}

/// Validates `site` with `GET /about.json`, then selects it.
pub async fn tether(sites: &SiteState, site: &str) -> Result<Tethered> {
    let selected = sites
        .build_client_for_site(site)
        .with_context(|| format!("Failed to validate --site {site}"))?;
    let about = selected
        .client
        .get("/about.json", None)
        .await
        .with_context(|| format!("Failed to validate --site {site}"))?
        .into_json();

    let title = about_title(&about).unwrap_or(&selected.base).to_string();
    sites.select_site(&selected.base)?;
    info!(site = %selected.base, title = %title, "Tethered to site");

    Ok(Tethered {
        base: selected.base,
        title,
    })
}

#[cfg(test)]
mod tests {
    use forumcp_store::SiteOptions;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn test_about_title_shapes() {
        assert_eq!(about_title(&json!({"about": {"title": "A"}})), Some("A"));
        assert_eq!(about_title(&json!({"title": "B"})), Some("B"));
        assert_eq!(about_title(&json!({"about": {}})), None);
    }

    #[tokio::test]
    async fn test_tether_selects_site() {
        let forum = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/about.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"about": {"title": "Meta"}})),
            )
            .mount(&forum)
            .await;

        let sites = SiteState::new(SiteOptions::default());
        let tethered = tether(&sites, &format!("{}/latest", forum.uri())).await.unwrap();

        assert_eq!(tethered.base, forum.uri());
        assert_eq!(tethered.title, "Meta");
        assert_eq!(sites.site_base().as_deref(), Some(forum.uri().as_str()));
    }

    #[tokio::test]
    async fn test_tether_failure_leaves_nothing_selected() {
        let forum = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/about.json"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&forum)
            .await;

        let sites = SiteState::new(SiteOptions::default());
        let err = tether(&sites, &forum.uri()).await.unwrap_err();

        assert!(err.to_string().contains("Failed to validate --site"));
        assert!(sites.site_base().is_none());
    }
}
