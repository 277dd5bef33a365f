//! Per-client cookie jar.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Attribute names that may follow a cookie inside a folded `Set-Cookie`.
const COOKIE_ATTRIBUTES: &[&str] = &[
    "expires", "path", "domain", "max-age", "samesite", "secure", "httponly", "partitioned",
    "priority",
];

/// Cookie store for one site.
///
/// Insertion order is kept for the `Cookie` header. Updates are upserts
/// keyed by name; the last value written wins.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<Vec<(String, String)>>,
}

impl CookieJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a jar from `name1=value1; name2=value2`.
    pub fn from_cookie_string(cookies: &str) -> Self {
        let jar = Self::new();
        for pair in cookies.split(';') {
            if let Some((name, value)) = split_pair(pair) {
                jar.set(name, value);
            }
        }
        jar
    }

    /// Upserts one cookie.
    pub fn set(&self, name: &str, value: &str) {
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        match cookies.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => cookies.push((name.to_string(), value.to_string())),
        }
    }

    /// Returns the value of a cookie.
    pub fn get(&self, name: &str) -> Option<String> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    /// Absorbs one `Set-Cookie` header value, which may hold several cookies.
    ///
    /// Malformed fragments are skipped. The first fragment is always a
    /// cookie; later fragments named like an attribute (`Expires=...`) are
    /// leftovers of the previous cookie and are dropped.
    pub fn absorb_set_cookie(&self, header: &str) {
        for (idx, fragment) in split_set_cookie(header).into_iter().enumerate() {
            let head = fragment.split(';').next().unwrap_or_default();
            let Some((name, value)) = split_pair(head) else {
                continue;
            };
            if idx > 0 && is_attribute(name) {
                continue;
            }
            self.set(name, value);
        }
    }

    /// Upserts every entry of a name/value map (bypass envelope cookies).
    pub fn merge_map(&self, cookies: &HashMap<String, String>) {
        for (name, value) in cookies {
            if !name.is_empty() {
                self.set(name, value);
            }
        }
    }

    /// Returns the `Cookie` header value, or `None` when the jar is empty.
    pub fn to_header(&self) -> Option<String> {
        let cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(n, v)| format!("{n}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Copies the jar into a plain map.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Returns true if no cookies are stored.
    pub fn is_empty(&self) -> bool {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

fn is_attribute(name: &str) -> bool {
    COOKIE_ATTRIBUTES.contains(&name.to_ascii_lowercase().as_str())
}

fn split_pair(text: &str) -> Option<(&str, &str)> {
    let (name, value) = text.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}

/// Splits a folded `Set-Cookie` value into one fragment per cookie.
///
/// A comma only separates cookies when what follows it (after optional
/// whitespace) is a `name=` token. Commas inside `Expires` dates are
/// followed by a day number and never split.
fn split_set_cookie(header: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut start = 0;
    for (idx, ch) in header.char_indices() {
        if ch == ',' && starts_with_cookie_name(&header[idx + 1..]) {
            fragments.push(&header[start..idx]);
            start = idx + 1;
        }
    }
    fragments.push(&header[start..]);
    fragments
}

fn starts_with_cookie_name(rest: &str) -> bool {
    let rest = rest.trim_start();
    let token_len = rest
        .chars()
        .take_while(|c| is_token_char(*c))
        .map(char::len_utf8)
        .sum::<usize>();
    token_len > 0 && rest[token_len..].starts_with('=')
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}
