//! Serve command: the MCP server on stdio.

use std::sync::Arc;

use anyhow::{Context, Result};
use forumcp_store::{Profile, SiteState};
use forumcp_tools::{McpServer, ToolContext, ToolRegistry, ToolSettings};
use tracing::{info, warn};

use crate::probe;
use crate::tether::{Tethered, tether};

/// Tool settings derived from the profile.
pub fn tool_settings(profile: &Profile, tethered: Option<&Tethered>) -> ToolSettings {
    ToolSettings {
        allow_writes: profile.writes_allowed(),
        hide_select_site: tethered.is_some(),
        default_search: profile.default_search.clone(),
        max_read_length: profile.max_read_length,
    }
}

fn instructions(tethered: Option<&Tethered>) -> String {
    match tethered {
        Some(site) => format!(
            "This server is tethered to {} ({}). All tools operate on that site.",
            site.base, site.title
        ),
        None => "Call discourse_select_site with a forum URL before using the other tools."
            .to_string(),
    }
}

/// Runs the server until stdin closes.
pub async fn run(profile: Profile) -> Result<()> {
    if profile.effective_bypass().is_some() {
        tokio::spawn(probe::warn_if_missing(profile.interpreter()));
    }

    let sites = Arc::new(SiteState::new(profile.site_options()));
    let tethered = match &profile.site {
        Some(site) => Some(tether(&sites, site).await?),
        None => None,
    };

    let settings = tool_settings(&profile, tethered.as_ref());
    if profile.allow_writes && !settings.allow_writes {
        warn!("allow_writes ignored: writes also need read_only=false and auth_pairs");
    }
    info!(
        writes = settings.allow_writes,
        bypass = ?profile.effective_bypass(),
        tethered = tethered.is_some(),
        "Starting forumcp"
    );

    let registry = ToolRegistry::new(ToolContext::new(sites, settings));
    let server = McpServer::new(registry).with_instructions(instructions(tethered.as_ref()));
    server.run_stdio().await.context("MCP server failed")
}

#[cfg(test)]
mod tests {
    use forumcp_core::AuthOverride;

    use super::*;

    #[test]
    fn test_tool_settings_from_profile() {
        let tethered = Tethered {
            base: "https://f.example".into(),
            title: "F".into(),
        };
        let profile = Profile {
            allow_writes: true,
            read_only: false,
            auth_pairs: vec![AuthOverride {
                api_key: Some("k".into()),
                ..AuthOverride::for_site("https://f.example")
            }],
            max_read_length: 10,
            ..Profile::default()
        };

        let settings = tool_settings(&profile, Some(&tethered));
        assert!(settings.allow_writes);
        assert!(settings.hide_select_site);
        assert_eq!(settings.max_read_length, 10);

        let open = tool_settings(&Profile::default(), None);
        assert!(!open.allow_writes);
        assert!(!open.hide_select_site);
        assert!(instructions(None).contains("discourse_select_site"));
    }
}
