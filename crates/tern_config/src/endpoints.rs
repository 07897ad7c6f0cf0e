//! Backend endpoint configuration.

use schematic::Config;
use serde::Serialize;
use url::Url;

use crate::error::Result;

/// Where the subscription and trigger endpoints live.
#[derive(Debug, Clone, PartialEq, Config, Serialize)]
#[config(rename_all = "snake_case")]
pub struct EndpointsConfig {
    /// Base URL of the backend.
    #[setting(default = "http://127.0.0.1:5005", env = "TERN_BASE_URL")]
    pub base_url: String,

    /// Path of the server-sent events subscription endpoint.
    #[setting(default = "/webhooks/sse/stream")]
    pub stream_path: String,

    /// Path of the endpoint that triggers generation.
    #[setting(default = "/webhooks/sse/webhook")]
    pub webhook_path: String,
}

impl EndpointsConfig {
    /// The subscription URL, without query parameters.
    pub fn stream_url(&self) -> Result<Url> {
        self.join(&self.stream_path)
    }

    pub fn webhook_url(&self) -> Result<Url> {
        self.join(&self.webhook_path)
    }

    fn join(&self, path: &str) -> Result<Url> {
        let base = Url::parse(&self.base_url)?;
        Ok(base.join(path)?)
    }
}
