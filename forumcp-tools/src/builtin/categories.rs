//! `discourse_list_categories` and `discourse_list_tags`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::{failure, str_field};
use crate::error::Result;
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::tool::{Tool, ToolContext};

const SITE_CACHE_TTL: Duration = Duration::from_secs(30);

fn no_arguments() -> Value {
    json!({"type": "object", "properties": {}, "additionalProperties": false})
}

fn array<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    data.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Lists categories from `/site.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListCategoriesTool;

#[async_trait]
impl Tool for ListCategoriesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "discourse_list_categories".into(),
            title: Some("List Categories".into()),
            description: "List categories visible to the current auth context.".into(),
            input_schema: no_arguments(),
        }
    }

    async fn execute(
        &self,
        _arguments: Value,
        ctx: &ToolContext,
        cancel: &CancellationToken,
    ) -> Result<ToolCallResult> {
        let site = match ctx.sites.ensure_selected_site() {
            Ok(site) => site,
            Err(e) => return Ok(failure("Failed to list categories", e)),
        };
        let data = match site.client.get_cached("/site.json", SITE_CACHE_TTL, Some(cancel)).await {
            Ok(payload) => payload.into_json(),
            Err(e) => return Ok(failure("Failed to list categories", e)),
        };

        let lines: Vec<String> = array(&data, "categories")
            .iter()
            .map(|c| {
                format!(
                    "- {} ({} topics)",
                    str_field(c, "name").unwrap_or("(unnamed)"),
                    c.get("topic_count").and_then(Value::as_u64).unwrap_or(0)
                )
            })
            .collect();

        if lines.is_empty() {
            Ok(ToolCallResult::text("No categories found."))
        } else {
            Ok(ToolCallResult::text(lines.join("\n")))
        }
    }
}

/// Lists tags from `/tags.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListTagsTool;

#[async_trait]
impl Tool for ListTagsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "discourse_list_tags".into(),
            title: Some("List Tags".into()),
            description: "List tags (if enabled).".into(),
            input_schema: no_arguments(),
        }
    }

    async fn execute(
        &self,
        _arguments: Value,
        ctx: &ToolContext,
        cancel: &CancellationToken,
    ) -> Result<ToolCallResult> {
        let site = match ctx.sites.ensure_selected_site() {
            Ok(site) => site,
            Err(e) => return Ok(failure("Failed to list tags", e)),
        };
        let data = match site.client.get("/tags.json", Some(cancel)).await {
            Ok(payload) => payload.into_json(),
            Err(e) => return Ok(failure("Failed to list tags", e)),
        };

        let lines: Vec<String> = array(&data, "tags")
            .iter()
            .filter_map(|t| {
                let id = str_field(t, "id").or_else(|| str_field(t, "name"))?;
                Some(format!(
                    "- {id} ({})",
                    t.get("count").and_then(Value::as_u64).unwrap_or(0)
                ))
            })
            .collect();

        if lines.is_empty() {
            Ok(ToolCallResult::text("No tags found or tags disabled."))
        } else {
            Ok(ToolCallResult::text(lines.join("\n")))
        }
    }
}
