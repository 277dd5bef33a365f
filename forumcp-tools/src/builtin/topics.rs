//! `discourse_read_topic`.

use async_trait::async_trait;
use forumcp_fetch::ForumClient;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::{display_time, failure, str_field, topic_url, truncate_chars};
use crate::error::{Result, ToolError};
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::tool::{Tool, ToolContext, parse_args, require};

const DEFAULT_POST_LIMIT: usize = 5;
const MAX_BATCHES: usize = 10;

#[derive(Debug, Deserialize)]
struct Args {
    topic_id: u64,
    #[serde(default)]
    post_limit: Option<usize>,
    #[serde(default)]
    start_post_number: Option<u64>,
}

#[derive(Debug)]
struct TopicPost {
    number: u64,
    username: String,
    created_at: String,
    content: String,
}

#[derive(Debug, Default)]
struct TopicView {
    title: Option<String>,
    slug: Option<String>,
    category_id: Option<u64>,
    tags: Vec<String>,
    posts: Vec<TopicPost>,
}

/// Reads topic metadata and a window of its posts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadTopicTool;

/// Fetches posts in `near=` batches until `limit` posts are collected.
async fn fetch_topic(
    client: &ForumClient,
    topic_id: u64,
    start: u64,
    limit: usize,
    max_len: usize,
    cancel: &CancellationToken,
) -> std::result::Result<TopicView, ToolError> {
    let mut view = TopicView::default();
    let mut current = start;

    for batch in 0..MAX_BATCHES {
        if view.posts.len() >= limit {
            break;
        }
        let path = if current > 1 {
            format!("/t/{topic_id}.json?near={current}&include_raw=true")
        } else {
            format!("/t/{topic_id}.json?include_raw=true")
        };
        let data = client.get(&path, Some(cancel)).await?.into_json();

        if batch == 0 {
            view.title = str_field(&data, "title").map(ToString::to_string);
            view.slug = str_field(&data, "slug").map(ToString::to_string);
            view.category_id = data.get("category_id").and_then(Value::as_u64);
            view.tags = data
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| tags.iter().filter_map(tag_name).collect())
                .unwrap_or_default();
        }

        let mut stream: Vec<&Value> = data
            .pointer("/post_stream/posts")
            .and_then(Value::as_array)
            .map(|posts| posts.iter().collect())
            .unwrap_or_default();
        stream.sort_by_key(|p| post_number(p));

        let fresh: Vec<&Value> = stream
            .into_iter()
            .filter(|p| post_number(p) >= current)
            .collect();
        let Some(last) = fresh.last() else {
            break;
        };
        current = post_number(last) + 1;

        for post in fresh {
            if view.posts.len() >= limit {
                break;
            }
            let content = str_field(post, "raw")
                .or_else(|| str_field(post, "cooked"))
                .or_else(|| str_field(post, "excerpt"))
                .unwrap_or_default();
            view.posts.push(TopicPost {
                number: post_number(post),
                username: str_field(post, "username").unwrap_or("unknown").to_string(),
                created_at: str_field(post, "created_at").unwrap_or_default().to_string(),
                content: truncate_chars(content, max_len).0.to_string(),
            });
        }
    }

    Ok(view)
}

fn post_number(post: &Value) -> u64 {
    post.get("post_number").and_then(Value::as_u64).unwrap_or(0)
}

/// Tags are strings on older sites and `{name}` objects on newer ones.
fn tag_name(tag: &Value) -> Option<String> {
    tag.as_str()
        .or_else(|| tag.get("name").and_then(Value::as_str))
        .map(ToString::to_string)
}

fn render(view: &TopicView, base: &str, topic_id: u64) -> String {
    let mut lines = Vec::new();
    match &view.title {
        Some(title) => lines.push(format!("# {title}")),
        None => lines.push(format!("# Topic {topic_id}")),
    }
    if let Some(category) = view.category_id {
        lines.push(format!("Category ID {category}"));
    }
    if !view.tags.is_empty() {
        lines.push(format!("Tags: {}", view.tags.join(", ")));
    }
    lines.push(String::new());

    for post in &view.posts {
        lines.push(format!(
            "- Post #{} by @{} ({})",
            post.number,
            post.username,
            display_time(&post.created_at)
        ));
        lines.push(format!("  {}", post.content));
    }

    lines.push(String::new());
    lines.push(format!(
        "Link: {}",
        topic_url(base, view.slug.as_deref(), topic_id)
    ));
    lines.join("\n")
}

#[async_trait]
impl Tool for ReadTopicTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "discourse_read_topic".into(),
            title: Some("Read Topic".into()),
            description: "Read a topic metadata and first N posts.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "topic_id": {"type": "integer", "minimum": 1},
                    "post_limit": {"type": "integer", "minimum": 1, "maximum": 100},
                    "start_post_number": {"type": "integer", "minimum": 1, "description": "Start from this post number (1-based)"}
                },
                "required": ["topic_id"]
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
        let limit = args.post_limit.unwrap_or(DEFAULT_POST_LIMIT);
        require(args.topic_id > 0, "topic_id must be positive")?;
        require((1..=100).contains(&limit), "post_limit must be between 1 and 100")?;
        let start = args.start_post_number.unwrap_or(1).max(1);

        let prefix = format!("Failed to read topic {}", args.topic_id);
        let site = match ctx.sites.ensure_selected_site() {
            Ok(site) => site,
            Err(e) => return Ok(failure(prefix, e)),
        };

        let max_len = ctx.settings.max_read_length;
        match fetch_topic(&site.client, args.topic_id, start, limit, max_len, cancel).await {
            Ok(view) => Ok(ToolCallResult::text(render(&view, &site.base, args.topic_id))),
            Err(e) => Ok(failure(prefix, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_without_metadata() {
        let view = TopicView {
            posts: vec![TopicPost {
                number: 1,
                username: "alice".into(),
                created_at: "2024-01-02T03:04:05Z".into(),
                content: "hello".into(),
            }],
            ..TopicView::default()
        };

        let text = render(&view, "https://f.example", 7);
        assert!(text.starts_with("# Topic 7\n"));
        assert!(text.contains("- Post #1 by @alice (2024-01-02 03:04 UTC)\n  hello"));
        assert!(text.ends_with("Link: https://f.example/t/7"));
    }

    #[test]
    fn test_tag_name_accepts_both_shapes() {
        assert_eq!(tag_name(&json!("rust")).as_deref(), Some("rust"));
        assert_eq!(tag_name(&json!({"name": "go"})).as_deref(), Some("go"));
        assert_eq!(tag_name(&json!(3)), None);
    }
}
