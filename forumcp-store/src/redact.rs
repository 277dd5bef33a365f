//! Secret redaction for log output.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

const REDACTED: &str = "<redacted>";

/// Keys whose values never appear in logs.
const SECRET_KEYS: &[&str] = &[
    "api_key",
    "user_api_key",
    "password",
    "second_factor_token",
    "cookies",
    "cookie",
];

/// `Api-Key: xyz` style header lines. Key headers end at whitespace;
/// `Authorization` and `Cookie` values run to end of line or closing quote.
static HEADER_SECRET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(?:(Api-Key|User-Api-Key):\s*[^\s"]+|(Authorization|Cookie):[ \t]*[^\r\n"]+)"#,
    )
    .expect("Invalid regex")
});

/// Redacts header-style secrets in free text.
pub fn redact_secrets(input: &str) -> String {
    HEADER_SECRET_RE
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            format!("{name}: {REDACTED}")
        })
        .into_owned()
}

/// Returns a copy of `value` with secret fields replaced.
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, v)| {
                    let secret = SECRET_KEYS.contains(&key.to_ascii_lowercase().as_str());
                    let redacted = if secret && !v.is_null() {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_value(v)
                    };
                    (key.clone(), redacted)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::String(text) => Value::String(redact_secrets(text)),
        other => other.clone(),
    }
}
