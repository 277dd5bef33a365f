//! File loading helpers and default paths.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - Linux: `~/.config/forumcp`
/// - macOS: `~/Library/Application Support/forumcp`
/// - Windows: `%APPDATA%\forumcp`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|c| c.join("forumcp"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the default profile path.
pub fn default_profile_path() -> PathBuf {
    default_config_dir().join("profile.json")
}

/// Returns the default helper script directory.
///
/// `helpers/` next to the executable when it exists, else `./helpers`.
pub fn default_helper_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("helpers")))
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| PathBuf::from("helpers"))
}

// ============================================================================
// File Operations
// ============================================================================

/// Loads data from a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading JSON file");

    let content = tokio::fs::read_to_string(path).await?;
    let data = serde_json::from_str(&content)?;

    debug!(path = %path.display(), "JSON file loaded");
    Ok(data)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_path() {
        let path = default_profile_path();
        assert!(path.ends_with("forumcp/profile.json"));
    }

    #[test]
    fn test_default_helper_dir() {
        assert!(default_helper_dir().ends_with("helpers"));
    }

    #[tokio::test]
    async fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        tokio::fs::write(&path, r#"{"key": "value"}"#).await.unwrap();

        let value: serde_json::Value = load_json(&path).await.unwrap();
        assert_eq!(value["key"], "value");
    }

    #[tokio::test]
    async fn test_load_nonexistent_file() {
        let result: Result<serde_json::Value, _> =
            load_json(Path::new("/nonexistent/path/profile.json")).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }
}
