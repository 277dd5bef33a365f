//! `discourse_create_post` and `discourse_create_topic`.
//!
//! Registered only when writes are enabled. Each write waits on the shared
//! rate limiter for its category before touching the network.

use async_trait::async_trait;
use forumcp_store::WriteCategory;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{failure, str_field};
use crate::error::Result;
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::tool::{Tool, ToolContext, parse_args, require};

const MAX_RAW_CHARS: usize = 30_000;
const MAX_TITLE_CHARS: usize = 300;
const MAX_TAGS: usize = 10;

fn check_raw(raw: &str) -> Result<()> {
    require(
        !raw.trim().is_empty() && raw.chars().count() <= MAX_RAW_CHARS,
        format!("raw must be 1 to {MAX_RAW_CHARS} characters"),
    )
}

fn u64_at(data: &Value, pointers: &[&str]) -> Option<u64> {
    pointers
        .iter()
        .find_map(|p| data.pointer(p).and_then(Value::as_u64))
}

// ============================================================================
// Create Post
// ============================================================================

#[derive(Debug, Deserialize)]
struct PostArgs {
    topic_id: u64,
    raw: String,
}

/// Replies to a topic.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreatePostTool;

#[async_trait]
impl Tool for CreatePostTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "discourse_create_post".into(),
            title: Some("Create Post".into()),
            description: "Create a post in a topic.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "topic_id": {"type": "integer", "minimum": 1},
                    "raw": {"type": "string", "minLength": 1, "maxLength": MAX_RAW_CHARS}
                },
                "required": ["topic_id", "raw"]
            }),
        }
    }

    async fn execute(
        &self,
        arguments: Value,
        ctx: &ToolContext,
        cancel: &CancellationToken,
    ) -> Result<ToolCallResult> {
        let args: PostArgs = parse_args(arguments)?;
        require(args.topic_id > 0, "topic_id must be positive")?;
        check_raw(&args.raw)?;

        let site = match ctx.sites.ensure_selected_site() {
            Ok(site) => site,
            Err(e) => return Ok(failure("Failed to create post", e)),
        };

        ctx.writes.acquire(WriteCategory::Post).await;
        let body = json!({"topic_id": args.topic_id, "raw": args.raw});
        let data = match site.client.post("/posts.json", &body, Some(cancel)).await {
            Ok(payload) => payload.into_json(),
            Err(e) => return Ok(failure("Failed to create post", e)),
        };

        let topic_id = u64_at(&data, &["/topic_id"]).unwrap_or(args.topic_id);
        let link = match u64_at(&data, &["/post_number", "/post/post_number"]) {
            Some(number) => format!("{}/t/{topic_id}/{number}", site.base),
            None => format!("{}/t/{topic_id}", site.base),
        };
        info!(site = %site.base, topic_id, "Created post");

        Ok(ToolCallResult::text(format!("Created post: {link}")))
    }
}

// ============================================================================
// Create Topic
// ============================================================================

#[derive(Debug, Deserialize)]
struct TopicArgs {
    title: String,
    raw: String,
    #[serde(default)]
    category_id: Option<u64>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Body for `POST /posts.json` that opens a topic.
fn topic_payload(args: &TopicArgs) -> Value {
    let mut payload = Map::new();
    payload.insert("title".into(), json!(args.title));
    payload.insert("raw".into(), json!(args.raw));
    if let Some(category) = args.category_id {
        payload.insert("category".into(), json!(category));
    }
    if !args.tags.is_empty() {
        payload.insert("tags".into(), json!(args.tags));
    }
    Value::Object(payload)
}

/// Opens a new topic.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateTopicTool;

#[async_trait]
impl Tool for CreateTopicTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "discourse_create_topic".into(),
            title: Some("Create Topic".into()),
            description: "Create a new topic with the given title and first post.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "minLength": 1, "maxLength": MAX_TITLE_CHARS},
                    "raw": {"type": "string", "minLength": 1, "maxLength": MAX_RAW_CHARS},
                    "category_id": {"type": "integer", "minimum": 1},
                    "tags": {
                        "type": "array",
                        "items": {"type": "string", "minLength": 1, "maxLength": 100},
                        "maxItems": MAX_TAGS
                    }
                },
                "required": ["title", "raw"]
            }),
        }
    }

    async fn execute(
        &self,
        arguments: Value,
        ctx: &ToolContext,
        cancel: &CancellationToken,
    ) -> Result<ToolCallResult> {
        let args: TopicArgs = parse_args(arguments)?;
        let title_len = args.title.chars().count();
        require(
            !args.title.trim().is_empty() && title_len <= MAX_TITLE_CHARS,
            format!("title must be 1 to {MAX_TITLE_CHARS} characters"),
        )?;
        check_raw(&args.raw)?;
        require(args.tags.len() <= MAX_TAGS, format!("at most {MAX_TAGS} tags"))?;

        let site = match ctx.sites.ensure_selected_site() {
            Ok(site) => site,
            Err(e) => return Ok(failure("Failed to create topic", e)),
        };

        ctx.writes.acquire(WriteCategory::Topic).await;
        let data = match site.client.post("/posts.json", &topic_payload(&args), Some(cancel)).await {
            Ok(payload) => payload.into_json(),
            Err(e) => return Ok(failure("Failed to create topic", e)),
        };

        let topic_id = u64_at(&data, &["/topic_id", "/topic/id"]);
        let slug = str_field(&data, "topic_slug")
            .or_else(|| data.get("topic").and_then(|t| str_field(t, "slug")));
        let post_number = u64_at(&data, &["/post_number", "/post/post_number"]).unwrap_or(1);
        let title = str_field(&data, "topic_title")
            .or_else(|| str_field(&data, "title"))
            .unwrap_or(&args.title);

        let link = match (topic_id, slug) {
            (Some(id), Some(slug)) => format!("{}/t/{slug}/{id}", site.base),
            (Some(id), None) => format!("{}/t/{id}/{post_number}", site.base),
            (None, _) => format!("{}/latest", site.base),
        };
        info!(site = %site.base, topic_id, "Created topic");

        Ok(ToolCallResult::text(format!("Created topic \"{title}\": {link}")))
    }
}
