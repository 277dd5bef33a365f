//! Check command: verifies helper dependencies and the configured site.

use anyhow::Result;
use forumcp_store::{Profile, SiteState};

use crate::probe::{PythonStatus, probe_python};
use crate::tether::tether;

fn mark(ok: bool) -> &'static str {
    if ok { "✓" } else { "✗" }
}

/// Prints one line per check; fails if any check failed.
pub async fn run(profile: &Profile) -> Result<()> {
    let mut healthy = true;

    match profile.effective_bypass() {
        Some(method) => {
            let interpreter = profile.interpreter();
            let status = probe_python(&interpreter).await;
            let ok = status == PythonStatus::Ready;
            healthy &= ok;
            println!("{:<15} {} {method} via {interpreter}", "Bypass", mark(ok));
            if let Some(hint) = status.hint(&interpreter) {
                println!("  {hint}");
            }
        }
        None => println!("{:<15} - disabled (direct requests)", "Bypass"),
    }

    match &profile.site {
        Some(site) => {
            let sites = SiteState::new(profile.site_options());
            match tether(&sites, site).await {
                Ok(tethered) => println!(
                    "{:<15} {} {} ({})",
                    "Site",
                    mark(true),
                    tethered.base,
                    tethered.title
                ),
                Err(e) => {
                    healthy = false;
                    println!("{:<15} {} {e:#}", "Site", mark(false));
                }
            }
        }
        None => println!("{:<15} - none configured (agent selects per session)", "Site"),
    }

    println!(
        "{:<15} {}",
        "Writes",
        if profile.writes_allowed() { "enabled" } else { "disabled" }
    );

    if healthy {
        Ok(())
    } else {
        anyhow::bail!("one or more checks failed")
    }
}
