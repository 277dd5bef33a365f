//! `discourse_select_site`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{failure, str_field};
use crate::error::Result;
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::tool::{Tool, ToolContext, parse_args};

#[derive(Debug, Deserialize)]
struct Args {
    site: String,
}

/// Validates a site via `/about.json` and makes it the selected site.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectSiteTool;

#[async_trait]
impl Tool for SelectSiteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "discourse_select_site".into(),
            title: Some("Select Site".into()),
            description: "Validate and select a Discourse site for subsequent tool calls.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "site": {"type": "string", "format": "uri", "description": "Base URL of the Discourse site"}
                },
                "required": ["site"]
            }),
        }
    }

    async fn execute(
        &self,
        arguments: Value,
        ctx: &ToolContext,
        cancel: &CancellationToken,
    ) -> Result<ToolCallResult> {
        let args: Args = parse_args(arguments)?;

        let site = match ctx.sites.build_client_for_site(&args.site) {
            Ok(site) => site,
            Err(e) => return Ok(failure("Failed to select site", e)),
        };
        let about = match site.client.get("/about.json", Some(cancel)).await {
            Ok(payload) => payload.into_json(),
            Err(e) => return Ok(failure("Failed to select site", e)),
        };
        let title = about
            .get("about")
            .and_then(|a| str_field(a, "title"))
            .or_else(|| str_field(&about, "title"))
            .unwrap_or(&site.base)
            .to_string();

        if let Err(e) = ctx.sites.select_site(&site.base) {
            return Ok(failure("Failed to select site", e));
        }
        info!(site = %site.base, title = %title, "Site selected by tool call");

        Ok(ToolCallResult::text(format!(
            "Selected site: {}\nTitle: {title}",
            site.base
        )))
    }
}
