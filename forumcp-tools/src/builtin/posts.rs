//! `discourse_read_post`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::{display_time, failure, str_field, truncate_chars};
use crate::error::Result;
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::tool::{Tool, ToolContext, parse_args, require};

const POST_CACHE_TTL: Duration = Duration::from_secs(10);
const EXCERPT_CHARS: usize = 1200;

#[derive(Debug, Deserialize)]
struct Args {
    post_id: u64,
}

/// Reads a single post.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadPostTool;

fn render(data: &Value, base: &str, post_id: u64) -> String {
    let username = str_field(data, "username").unwrap_or("user");
    let created = str_field(data, "created_at").map(display_time).unwrap_or_default();
    let raw = str_field(data, "raw")
        .or_else(|| str_field(data, "cooked"))
        .unwrap_or_default();
    let (excerpt, dropped) = truncate_chars(raw, EXCERPT_CHARS);

    let topic_id = data.get("topic_id").and_then(Value::as_u64);
    let post_number = data.get("post_number").and_then(Value::as_u64);
    let url = match (str_field(data, "topic_slug"), topic_id, post_number) {
        (Some(slug), Some(topic), Some(number)) => format!("{base}/t/{slug}/{topic}/{number}"),
        _ => format!("{base}/posts/{post_id}"),
    };

    let mut text = format!("Post by @{username} ({created})\n\n{excerpt}");
    if dropped > 0 {
        text.push_str(&format!("\n... (+{dropped} more)"));
    }
    text.push_str(&format!("\n\nLink: {url}"));
    text
}

#[async_trait]
impl Tool for ReadPostTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "discourse_read_post".into(),
            title: Some("Read Post".into()),
            description: "Read a specific post.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "post_id": {"type": "integer", "minimum": 1}
                },
                "required": ["post_id"]
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
        require(args.post_id > 0, "post_id must be positive")?;

        let prefix = format!("Failed to read post {}", args.post_id);
        let site = match ctx.sites.ensure_selected_site() {
            Ok(site) => site,
            Err(e) => return Ok(failure(prefix, e)),
        };

        let path = format!("/posts/{}.json", args.post_id);
        match site.client.get_cached(&path, POST_CACHE_TTL, Some(cancel)).await {
            Ok(payload) => Ok(ToolCallResult::text(render(
                &payload.into_json(),
                &site.base,
                args.post_id,
            ))),
            Err(e) => Ok(failure(prefix, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_long_post_with_topic_link() {
        let data = json!({
            "username": "bob",
            "created_at": "2024-05-06T07:08:09Z",
            "raw": "x".repeat(1250),
            "topic_slug": "hello-world",
            "topic_id": 12,
            "post_number": 3
        });

        let text = render(&data, "https://f.example", 99);
        assert!(text.starts_with("Post by @bob (2024-05-06 07:08 UTC)"));
        assert!(text.contains("... (+50 more)"));
        assert!(text.ends_with("Link: https://f.example/t/hello-world/12/3"));
    }

    #[test]
    fn test_render_falls_back_to_post_link() {
        let text = render(&json!({"cooked": "<p>hi</p>"}), "https://f.example", 5);
        assert!(text.starts_with("Post by @user ()"));
        assert!(text.ends_with("Link: https://f.example/posts/5"));
    }
}
