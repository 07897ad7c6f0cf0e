use std::sync::Arc;

use tern_config::AppConfig;
use tern_stream::HttpEventSource;
use tern_turn::{CoordinatorConfig, CoordinatorHandle, Notice, TriggerDispatcher, TurnCoordinator};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Globals, Result};

/// Context for the CLI application
pub(crate) struct Ctx {
    pub(crate) globals: Globals,
    pub(crate) config: AppConfig,

    /// Resolved identity of the conversation.
    pub(crate) sender_id: String,
}

impl Ctx {
    pub(crate) fn new(globals: Globals, config: AppConfig) -> Self {
        let sender_id = resolve_sender_id(globals.sender_id.as_deref(), config.sender_id.as_deref());
        debug!(sender_id, "Resolved conversation identity.");

        Self {
            globals,
            config,
            sender_id,
        }
    }

    /// Start a coordinator for the configured backend.
    pub(crate) fn coordinator(&self) -> Result<(CoordinatorHandle, mpsc::UnboundedReceiver<Notice>)> {
        let endpoints = &self.config.endpoints;
        let timing = &self.config.timing;

        let source = HttpEventSource::new(endpoints.stream_url()?);
        let trigger =
            TriggerDispatcher::new(endpoints.webhook_url()?).with_timeout(timing.trigger_timeout());

        let config = CoordinatorConfig::new(self.sender_id.clone())
            .with_guard(timing.guard())
            .with_quiet(timing.quiet())
            .with_reconnect(timing.reconnect())
            .with_metadata(self.config.trigger.metadata.clone());

        info!(base_url = endpoints.base_url, "Connecting to backend.");
        let (coordinator, notices) = TurnCoordinator::new(config, Arc::new(source), Arc::new(trigger));

        Ok((coordinator.spawn(), notices))
    }
}

fn resolve_sender_id(flag: Option<&str>, configured: Option<&str>) -> String {
    flag.or(configured)
        .map_or_else(|| format!("user_{}", Uuid::new_v4()), str::to_owned)
}
