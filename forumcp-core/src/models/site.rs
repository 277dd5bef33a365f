//! Site identity.
//!
//! A site is identified by its normalized base: the URL with path reset to
//! the root and query/fragment removed, without a trailing slash.

use url::Url;

use crate::error::CoreError;

/// Normalizes a site URL to its origin + root path form.
///
/// `https://forum.example/t/123?x=1` becomes `https://forum.example`.
pub fn normalize_base(url: &str) -> Result<String, CoreError> {
    let mut parsed = parse_site(url)?;
    parsed.set_path("/");
    parsed.set_query(None);
    parsed.set_fragment(None);
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Returns true if both URLs share scheme, host and port.
///
/// Unparseable input never matches.
pub fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin() && a.origin().is_tuple(),
        _ => false,
    }
}

fn parse_site(url: &str) -> Result<Url, CoreError> {
    let parsed = Url::parse(url.trim()).map_err(|e| CoreError::InvalidSiteUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CoreError::InvalidSiteUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    if parsed.host_str().is_none() {
        return Err(CoreError::InvalidSiteUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(parsed)
}
