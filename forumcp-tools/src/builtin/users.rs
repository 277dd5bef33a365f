//! `discourse_get_user`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::{display_time, encode_segment, failure, str_field, truncate_chars};
use crate::error::Result;
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::tool::{Tool, ToolContext, parse_args, require};

const BIO_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
struct Args {
    username: String,
}

/// Basic profile information for one user.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetUserTool;

fn render(data: &Value, base: &str, username: &str) -> String {
    let user = data.get("user").unwrap_or(data);
    let mut lines = vec![format!(
        "@{username} ({})",
        str_field(user, "name").unwrap_or(username)
    )];

    if let Some(trust) = user.get("trust_level").and_then(Value::as_u64) {
        lines.push(format!("Trust level: {trust}"));
    }
    if let Some(created) = str_field(user, "created_at") {
        lines.push(format!("Joined: {}", display_time(created)));
    }
    if let Some(bio) = str_field(user, "bio_raw") {
        lines.push(String::new());
        lines.push(truncate_chars(bio, BIO_CHARS).0.to_string());
    }
    lines.push(format!("Profile: {base}/u/{}", encode_segment(username)));
    lines.join("\n")
}

#[async_trait]
impl Tool for GetUserTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "discourse_get_user".into(),
            title: Some("Get User".into()),
            description: "Get basic user info.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "username": {"type": "string", "minLength": 1}
                },
                "required": ["username"]
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
        require(!args.username.is_empty(), "username must not be empty")?;

        let prefix = format!("Failed to get user {}", args.username);
        let site = match ctx.sites.ensure_selected_site() {
            Ok(site) => site,
            Err(e) => return Ok(failure(prefix, e)),
        };

        let path = format!("/u/{}.json", encode_segment(&args.username));
        match site.client.get(&path, Some(cancel)).await {
            Ok(payload) => Ok(ToolCallResult::text(render(
                &payload.into_json(),
                &site.base,
                &args.username,
            ))),
            Err(e) => Ok(failure(prefix, e)),
        }
    }
}
