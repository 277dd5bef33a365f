//! Cloudflare bypass selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// ============================================================================
// Bypass Technique
// ============================================================================

/// One concrete bypass helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassTechnique {
    /// Python `cloudscraper` helper.
    Cloudscraper,
    /// Python `curl_cffi` browser-impersonation helper.
    CurlCffi,
}

impl BypassTechnique {
    /// Stable identifier used in logs and config.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Cloudscraper => "cloudscraper",
            Self::CurlCffi => "curl_cffi",
        }
    }

    /// File name of the helper script for this technique.
    pub fn script_name(&self) -> &'static str {
        match self {
            Self::Cloudscraper => "cloudscraper_wrapper.py",
            Self::CurlCffi => "curl_cffi_wrapper.py",
        }
    }

    /// Python package the helper imports.
    pub fn python_package(&self) -> &'static str {
        match self {
            Self::Cloudscraper => "cloudscraper",
            Self::CurlCffi => "curl_cffi",
        }
    }

    /// Whether the helper accepts login credentials.
    pub fn supports_login(&self) -> bool {
        matches!(self, Self::CurlCffi)
    }
}

impl fmt::Display for BypassTechnique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// ============================================================================
// Bypass Method
// ============================================================================

/// Which bypass helpers a client routes requests through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassMethod {
    /// Only cloudscraper.
    Cloudscraper,
    /// Only curl_cffi.
    CurlCffi,
    /// cloudscraper first, curl_cffi when cloudscraper fails.
    #[default]
    Both,
}

impl BypassMethod {
    /// The technique tried first.
    pub fn primary(&self) -> BypassTechnique {
        match self {
            Self::Cloudscraper | Self::Both => BypassTechnique::Cloudscraper,
            Self::CurlCffi => BypassTechnique::CurlCffi,
        }
    }

    /// The technique used when the primary fails, if any.
    pub fn fallback(&self) -> Option<BypassTechnique> {
        match self {
            Self::Both => Some(BypassTechnique::CurlCffi),
            Self::Cloudscraper | Self::CurlCffi => None,
        }
    }

    /// All techniques this method may use, in order.
    pub fn techniques(&self) -> Vec<BypassTechnique> {
        std::iter::once(self.primary()).chain(self.fallback()).collect()
    }
}

impl fmt::Display for BypassMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cloudscraper => "cloudscraper",
            Self::CurlCffi => "curl_cffi",
            Self::Both => "both",
        })
    }
}

impl FromStr for BypassMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "cloudscraper" => Ok(Self::Cloudscraper),
            "curl_cffi" | "curlcffi" => Ok(Self::CurlCffi),
            "both" => Ok(Self::Both),
            other => Err(CoreError::UnknownBypassMethod(other.to_string())),
        }
    }
}
