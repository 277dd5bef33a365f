//! Profile resolution: file, then flags, then environment for login.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use forumcp_core::BypassMethod;
use forumcp_store::{LogLevel, Profile, default_profile_path, parse_auth_pairs, resolve_login};
use tracing::warn;

/// Flags layered over the profile file.
#[derive(Debug, Clone, Default, Args)]
pub struct ProfileArgs {
    /// Profile JSON file (default: <config dir>/forumcp/profile.json if present).
    #[arg(long, global = true, value_name = "PATH")]
    pub profile: Option<PathBuf>,

    /// Tether to this site at startup and hide site selection.
    #[arg(long, global = true, value_name = "URL")]
    pub site: Option<String>,

    /// Per-site credentials as a JSON list.
    #[arg(long, global = true, value_name = "JSON")]
    pub auth_pairs: Option<String>,

    /// Refuse writes (default: true).
    #[arg(long, global = true, value_name = "BOOL")]
    pub read_only: Option<bool>,

    /// Register write tools (also needs --read-only false and credentials).
    #[arg(long, global = true)]
    pub allow_writes: bool,

    /// Per-request timeout in milliseconds.
    #[arg(long, global = true, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Log level: silent, error, info or debug.
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Prefix added to every search query.
    #[arg(long, global = true, value_name = "PREFIX")]
    pub default_search: Option<String>,

    /// Truncate post content beyond this many characters.
    #[arg(long, global = true, value_name = "CHARS")]
    pub max_read_length: Option<usize>,

    /// Cloudflare bypass: cloudscraper, curl_cffi or both.
    #[arg(long, global = true, value_name = "METHOD")]
    pub bypass_method: Option<BypassMethod>,

    /// Legacy switch for --bypass-method both.
    #[arg(long, global = true)]
    pub use_cloudscraper: bool,

    /// Send requests directly instead of through bypass helpers.
    #[arg(long, global = true)]
    pub no_bypass: bool,

    /// Python interpreter for bypass helpers.
    #[arg(long, global = true, value_name = "PATH")]
    pub python_path: Option<String>,

    /// Directory holding the bypass helper scripts.
    #[arg(long, global = true, value_name = "DIR")]
    pub helper_dir: Option<PathBuf>,

    /// Login name for the tethered site (or FORUMCP_USERNAME).
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Login password for the tethered site (or FORUMCP_PASSWORD).
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Two-factor token (or FORUMCP_2FA_TOKEN).
    #[arg(long = "2fa-token", global = true, value_name = "TOKEN")]
    pub second_factor_token: Option<String>,
}

/// Loads the profile file, if any, and applies flags and environment.
pub async fn resolve(args: &ProfileArgs) -> Result<Profile> {
    let mut profile = load(args.profile.as_deref()).await?;
    apply_overrides(&mut profile, args, |key| std::env::var(key).ok())?;
    Ok(profile)
}

async fn load(path: Option<&Path>) -> Result<Profile> {
    match path {
        Some(path) => Profile::load(path)
            .await
            .with_context(|| format!("Failed to load profile {}", path.display())),
        None => {
            let default = default_profile_path();
            if default.is_file() {
                Profile::load(&default)
                    .await
                    .with_context(|| format!("Failed to load profile {}", default.display()))
            } else {
                Ok(Profile::default())
            }
        }
    }
}

/// Applies flags over `profile`, then merges login credentials.
pub fn apply_overrides(
    profile: &mut Profile,
    args: &ProfileArgs,
    env: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(site) = &args.site {
        profile.site = Some(site.clone());
    }
    if let Some(json) = &args.auth_pairs {
        profile.auth_pairs = parse_auth_pairs(json).context("Invalid --auth-pairs")?;
    }
    if let Some(read_only) = args.read_only {
        profile.read_only = read_only;
    }
    if args.allow_writes {
        profile.allow_writes = true;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        profile.timeout_ms = timeout_ms;
    }
    if let Some(level) = args.log_level {
        profile.log_level = level;
    }
    if let Some(prefix) = &args.default_search {
        profile.default_search = Some(prefix.clone());
    }
    if let Some(max) = args.max_read_length {
        profile.max_read_length = max;
    }
    if let Some(method) = args.bypass_method {
        profile.bypass_method = method;
    }
    if args.use_cloudscraper {
        profile.use_cloudscraper = Some(true);
    }
    if args.no_bypass {
        profile.no_bypass = true;
    }
    if let Some(python) = &args.python_path {
        profile.python_path = Some(python.clone());
    }
    if let Some(dir) = &args.helper_dir {
        profile.helper_dir = Some(dir.clone());
    }

    let login = resolve_login(
        args.username.clone(),
        args.password.clone(),
        args.second_factor_token.clone(),
        env,
    );
    match (login, profile.site.clone()) {
        (Some(login), Some(site)) => profile.merge_login(&site, login),
        (Some(_), None) => warn!("Login credentials ignored: no site to attach them to (use --site)"),
        (None, _) => {}
    }

    Ok(())
}
