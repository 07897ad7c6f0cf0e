use std::{fmt, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, trace};
use url::Url;

use crate::{
    error::{Error, Result},
    turn::TurnId,
};

/// Default bound on a single trigger request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of the request that starts generation for a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerRequest {
    pub sender: String,
    pub text: String,
    pub gen_id: String,

    /// Always carries `gen_id`, plus any configured extras.
    pub metadata: Map<String, Value>,
}

impl TriggerRequest {
    /// Build a request for `turn`.
    ///
    /// Keys in `extra` are merged into the metadata and take precedence.
    #[must_use]
    pub fn new(
        sender: impl Into<String>,
        text: impl Into<String>,
        turn: &TurnId,
        extra: &Map<String, Value>,
    ) -> Self {
        let mut metadata = Map::new();
        metadata.insert("gen_id".to_owned(), Value::String(turn.to_string()));
        metadata.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            sender: sender.into(),
            text: text.into(),
            gen_id: turn.to_string(),
            metadata,
        }
    }
}

/// Asks the backend to start generating a reply.
///
/// A trigger is fired once per turn and never retried.
#[async_trait]
pub trait Trigger: fmt::Debug + Send + Sync {
    async fn trigger(&self, request: &TriggerRequest) -> Result<()>;
}

/// Posts [`TriggerRequest`]s to the backend webhook.
#[derive(Debug, Clone)]
pub struct TriggerDispatcher {
    http_client: reqwest::Client,
    url: Url,
    timeout: Duration,
}

impl TriggerDispatcher {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            url,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Trigger for TriggerDispatcher {
    async fn trigger(&self, request: &TriggerRequest) -> Result<()> {
        trace!(url = %self.url, gen_id = request.gen_id, "Triggering generation.");

        let response = self
            .http_client
            .post(self.url.clone())
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        trace!(status = status.as_u16(), "Received trigger response.");

        if status.is_client_error() || status.is_server_error() {
            let status = status.as_u16();
            let body = response.text().await?;

            error!(status, body, "Unexpected trigger response.");

            return Err(Error::Api {
                code: status,
                message: body,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
