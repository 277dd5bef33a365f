//! cloudscraper technique.

use std::path::Path;

use async_trait::async_trait;
use forumcp_core::BypassTechnique;
use tracing::debug;

use super::{BypassRequest, BypassResponse, BypassTransport, ScriptBridge};
use crate::error::BridgeError;

/// Routes requests through the `cloudscraper` helper.
///
/// This helper cannot log in; any login credentials are dropped from the
/// envelope before it is sent.
#[derive(Debug, Clone)]
pub struct CloudscraperTransport {
    bridge: ScriptBridge,
}

impl CloudscraperTransport {
    /// Creates a transport using `<helper_dir>/cloudscraper_wrapper.py`.
    pub fn new(interpreter: impl Into<String>, helper_dir: &Path) -> Self {
        Self::from_bridge(ScriptBridge::new(BypassTechnique::Cloudscraper, interpreter, helper_dir))
    }

    /// Wraps an existing bridge.
    pub fn from_bridge(bridge: ScriptBridge) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl BypassTransport for CloudscraperTransport {
    fn technique(&self) -> BypassTechnique {
        BypassTechnique::Cloudscraper
    }

    async fn request(&self, request: &BypassRequest) -> Result<BypassResponse, BridgeError> {
        if request.login.is_some() {
            debug!("cloudscraper does not support login, dropping credentials");
            let stripped = BypassRequest {
                login: None,
                ..request.clone()
            };
            return self.bridge.exchange(&stripped).await;
        }
        self.bridge.exchange(request).await
    }
}
