//! `discourse_search`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::{failure, str_field, topic_url};
use crate::error::Result;
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::tool::{Tool, ToolContext, parse_args, require};

const DEFAULT_MAX_RESULTS: usize = 10;

#[derive(Debug, Deserialize)]
struct Args {
    query: String,
    #[serde(default)]
    max_results: Option<usize>,
}

/// Full-text search over topics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchTool;

/// Query with the configured prefix prepended.
fn full_query(prefix: Option<&str>, query: &str) -> String {
    match prefix.map(str::trim).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix} {query}"),
        None => query.to_string(),
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "discourse_search".into(),
            title: Some("Discourse Search".into()),
            description: "Search site content.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "minLength": 1, "description": "Search query"},
                    "max_results": {"type": "integer", "minimum": 1, "maximum": 50}
                },
                "required": ["query"]
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
        require(!args.query.trim().is_empty(), "query must not be empty")?;
        let max_results = args.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        require(
            (1..=50).contains(&max_results),
            "max_results must be between 1 and 50",
        )?;

        let site = match ctx.sites.ensure_selected_site() {
            Ok(site) => site,
            Err(e) => return Ok(failure("Search failed", e)),
        };

        let query = full_query(ctx.settings.default_search.as_deref(), &args.query);
        let path = format!(
            "/search.json?{}",
            url::form_urlencoded::Serializer::new(String::new())
                .append_pair("expanded", "true")
                .append_pair("q", &query)
                .finish()
        );
        let data = match site.client.get(&path, Some(cancel)).await {
            Ok(payload) => payload.into_json(),
            Err(e) => return Ok(failure("Search failed", e)),
        };

        let topics = data
            .get("topics")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut lines = vec![format!("Top results for \"{query}\":")];
        let mut results = Vec::new();
        for (idx, topic) in topics.iter().take(max_results).enumerate() {
            let Some(id) = topic.get("id").and_then(Value::as_u64) else {
                continue;
            };
            let title = str_field(topic, "title").unwrap_or("(untitled)");
            let url = topic_url(&site.base, str_field(topic, "slug"), id);
            lines.push(format!("{}. {title} - {url}", idx + 1));
            results.push(json!({"id": id, "url": url, "title": title}));
        }
        if results.is_empty() {
            lines.push("No results.".into());
        }

        let footer = json!({ "results": results });
        Ok(ToolCallResult::text(format!(
            "{}\n\n```json\n{footer}\n```\n",
            lines.join("\n")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_query_prefix() {
        assert_eq!(full_query(None, "rust"), "rust");
        assert_eq!(full_query(Some("#dev"), "rust"), "#dev rust");
        assert_eq!(full_query(Some("  "), "rust"), "rust");
    }
}
