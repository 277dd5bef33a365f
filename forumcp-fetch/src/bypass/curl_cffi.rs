//! curl_cffi technique.

use std::path::Path;

use async_trait::async_trait;
use forumcp_core::BypassTechnique;

use super::{BypassRequest, BypassResponse, BypassTransport, ScriptBridge};
use crate::error::BridgeError;

/// Routes requests through the `curl_cffi` browser-impersonation helper.
///
/// Login credentials in the envelope are forwarded; the helper logs in
/// before performing the request.
#[derive(Debug, Clone)]
pub struct CurlCffiTransport {
    bridge: ScriptBridge,
}

impl CurlCffiTransport {
    /// Creates a transport using `<helper_dir>/curl_cffi_wrapper.py`.
    pub fn new(interpreter: impl Into<String>, helper_dir: &Path) -> Self {
        Self::from_bridge(ScriptBridge::new(BypassTechnique::CurlCffi, interpreter, helper_dir))
    }

    /// Wraps an existing bridge.
    pub fn from_bridge(bridge: ScriptBridge) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl BypassTransport for CurlCffiTransport {
    fn technique(&self) -> BypassTechnique {
        BypassTechnique::CurlCffi
    }

    async fn request(&self, request: &BypassRequest) -> Result<BypassResponse, BridgeError> {
        self.bridge.exchange(request).await
    }
}
