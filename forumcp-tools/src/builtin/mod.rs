//! Built-in Discourse tools.
//!
//! Each tool is a thin formatter over one or two JSON endpoints.

mod categories;
mod posts;
mod search;
mod select_site;
mod topics;
mod users;
mod write;

use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

pub use categories::{ListCategoriesTool, ListTagsTool};
pub use posts::ReadPostTool;
pub use search::SearchTool;
pub use select_site::SelectSiteTool;
pub use topics::ReadTopicTool;
pub use users::GetUserTool;
pub use write::{CreatePostTool, CreateTopicTool};

use crate::protocol::ToolCallResult;
use crate::tool::{Tool, ToolSettings};

/// Tools to register for the given settings.
pub fn builtin_tools(settings: &ToolSettings) -> Vec<Arc<dyn Tool>> {
    let mut tools: Vec<Arc<dyn Tool>> = Vec::new();

    if !settings.hide_select_site {
        tools.push(Arc::new(SelectSiteTool));
    }
    tools.push(Arc::new(SearchTool));
    tools.push(Arc::new(ReadTopicTool));
    tools.push(Arc::new(ReadPostTool));
    tools.push(Arc::new(ListCategoriesTool));
    tools.push(Arc::new(ListTagsTool));
    tools.push(Arc::new(GetUserTool));

    if settings.allow_writes {
        tools.push(Arc::new(CreatePostTool));
        tools.push(Arc::new(CreateTopicTool));
    }

    tools
}

// ============================================================================
// Formatting helpers
// ============================================================================

/// Error result with a tool-specific prefix.
pub(crate) fn failure(prefix: impl Display, err: impl Display) -> ToolCallResult {
    ToolCallResult::error(format!("{prefix}: {err}"))
}

/// Non-empty string field.
pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// First `max` characters of `text` and the number of characters dropped.
pub(crate) fn truncate_chars(text: &str, max: usize) -> (&str, usize) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (&text[..idx], text[idx..].chars().count()),
        None => (text, 0),
    }
}

/// Renders a Discourse timestamp as `YYYY-MM-DD HH:MM UTC`, else verbatim.
pub(crate) fn display_time(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc).format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Percent-encodes one URL path segment.
pub(crate) fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Canonical topic link.
pub(crate) fn topic_url(base: &str, slug: Option<&str>, topic_id: u64) -> String {
    match slug {
        Some(slug) => format!("{base}/t/{slug}/{topic_id}"),
        None => format!("{base}/t/{topic_id}"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), ("hé", 3));
        assert_eq!(truncate_chars("short", 10), ("short", 0));
    }

    #[test]
    fn test_display_time() {
        assert_eq!(
            display_time("2024-03-01T09:30:00.000Z"),
            "2024-03-01 09:30 UTC"
        );
        assert_eq!(display_time("yesterday"), "yesterday");
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("jane doe"), "jane%20doe");
        assert_eq!(encode_segment("a/b"), "a%2Fb");
    }

    #[test]
    fn test_str_field_skips_empty() {
        let value = json!({"a": "x", "b": ""});
        assert_eq!(str_field(&value, "a"), Some("x"));
        assert_eq!(str_field(&value, "b"), None);
        assert_eq!(str_field(&value, "c"), None);
    }

    #[test]
    fn test_write_tools_need_allow_writes() {
        let names = |settings: &ToolSettings| {
            builtin_tools(settings)
                .iter()
                .map(|t| t.definition().name)
                .collect::<Vec<_>>()
        };

        let read_only = names(&ToolSettings::default());
        assert!(read_only.contains(&"discourse_select_site".to_string()));
        assert!(!read_only.contains(&"discourse_create_post".to_string()));

        let tethered_writer = names(&ToolSettings {
            allow_writes: true,
            hide_select_site: true,
            ..ToolSettings::default()
        });
        assert!(!tethered_writer.contains(&"discourse_select_site".to_string()));
        assert!(tethered_writer.contains(&"discourse_create_topic".to_string()));
    }
}
