// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! forumcp - Discourse forums as MCP tools.
//!
//! # Examples
//!
//! ```bash
//! # Serve on stdio; the agent picks a site with discourse_select_site
//! forumcp
//!
//! # Tether to one site
//! forumcp --site https://meta.discourse.org
//!
//! # Allow writes with an admin API key
//! forumcp --site https://forum.example --read-only false --allow-writes \
//!   --auth-pairs '[{"site":"https://forum.example","api_key":"...","api_username":"system"}]'
//!
//! # Send requests directly instead of through the Python helpers
//! forumcp --no-bypass
//!
//! # Check helper dependencies and the configured site
//! forumcp check --site https://forum.example
//! ```

mod commands;
mod config;
mod probe;
mod tether;

use anyhow::Result;
use clap::{Parser, Subcommand};
use forumcp_store::{LogLevel, redact_value};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use config::ProfileArgs;

// ============================================================================
// CLI Definition
// ============================================================================

/// forumcp - Discourse forums as MCP tools.
#[derive(Parser)]
#[command(name = "forumcp")]
#[command(about = "MCP server exposing Discourse forums as agent tools")]
#[command(long_about = r#"
forumcp speaks the Model Context Protocol on stdin/stdout and exposes a
Discourse forum's REST API as tools: search, read topics and posts, list
categories and tags, look up users and, when enabled, create posts and topics.

Requests go through Python Cloudflare-bypass helpers (cloudscraper and
curl_cffi) unless --no-bypass is given.

Configuration is read from a JSON profile, then overridden by flags.
Login credentials may also come from FORUMCP_USERNAME, FORUMCP_PASSWORD and
FORUMCP_2FA_TOKEN.
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, serves on stdio.
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub profile: ProfileArgs,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Serve MCP on stdin/stdout (default).
    Serve,

    /// Check helper dependencies and the configured site.
    Check,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// General error.
    Error = 1,
}

// ============================================================================
// Logging Setup
// ============================================================================

/// Logs go to stderr; stdout carries the protocol.
fn setup_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let profile = match config::resolve(&cli.profile).await {
        Ok(profile) => profile,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(ExitCode::Error as i32);
        }
    };

    setup_logging(profile.log_level);
    if let Ok(value) = serde_json::to_value(&profile) {
        debug!(config = %redact_value(&value), "Effective configuration");
    }

    let result = match cli.command {
        Some(Commands::Check) => commands::check::run(&profile).await,
        Some(Commands::Serve) | None => commands::serve::run(profile).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(ExitCode::Error as i32);
    }

    Ok(())
}
