//! Configuration for the `tern` client.
//!
//! Values are resolved from defaults, an optional TOML file and `TERN_*`
//! environment variables, in increasing order of precedence.

pub mod endpoints;
mod error;
pub mod timing;
pub mod trigger;

use camino::Utf8Path;
use schematic::{Config, ConfigLoader};
use serde::Serialize;
use tracing::{debug, trace};

pub use error::Error;
use error::Result;

use crate::{
    endpoints::{EndpointsConfig, PartialEndpointsConfig},
    timing::{PartialTimingConfig, TimingConfig},
    trigger::{PartialTriggerConfig, TriggerConfig},
};

/// Configuration file looked up in the working directory, if no explicit
/// file is given.
pub const DEFAULT_FILE: &str = "tern.toml";

#[derive(Debug, Clone, PartialEq, Config, Serialize)]
#[config(rename_all = "snake_case")]
pub struct AppConfig {
    /// Stable identity of the conversation.
    ///
    /// A fresh identity is generated for every process if unset.
    #[setting(env = "TERN_SENDER_ID")]
    pub sender_id: Option<String>,

    #[setting(nested)]
    pub endpoints: EndpointsConfig,

    #[setting(nested)]
    pub timing: TimingConfig,

    #[setting(nested)]
    pub trigger: TriggerConfig,
}

impl AppConfig {
    /// Check constraints between values that the loader cannot express.
    pub fn validate(&self) -> Result<()> {
        self.timing.validate()?;
        self.endpoints.stream_url()?;
        self.endpoints.webhook_url()?;

        if self.sender_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(Error::invalid("sender_id", "must not be empty"));
        }

        Ok(())
    }
}

/// Load and validate the configuration.
///
/// With an explicit `path` the file must exist. Without one,
/// [`DEFAULT_FILE`] is loaded if present.
pub fn load(path: Option<&Utf8Path>) -> Result<AppConfig> {
    let mut loader = ConfigLoader::<AppConfig>::new();
    match path {
        Some(path) => {
            trace!(%path, "Loading configuration file.");
            loader.file(path.as_std_path())?;
        }
        None => {
            trace!(path = DEFAULT_FILE, "Loading optional configuration file.");
            loader.file_optional(Utf8Path::new(DEFAULT_FILE).as_std_path())?;
        }
    }

    let config = loader.load()?.config;
    config.validate()?;

    debug!(
        base_url = config.endpoints.base_url,
        guard_ms = config.timing.guard_ms,
        quiet_ms = config.timing.quiet_ms,
        "Configuration loaded."
    );

    Ok(config)
}

#[cfg(test)]
struct EnvVarGuard {
    name: String,
    original_value: Option<String>,
}

#[cfg(test)]
impl EnvVarGuard {
    fn set(name: &str, value: Option<&str>) -> Self {
        let name = name.to_string();
        let original_value = std::env::var(&name).ok();
        match value {
            Some(value) => unsafe { std::env::set_var(&name, value) },
            None => unsafe { std::env::remove_var(&name) },
        }

        Self {
            name,
            original_value,
        }
    }
}

#[cfg(test)]
impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        if let Some(ref original) = self.original_value {
            unsafe { std::env::set_var(&self.name, original) };
        } else {
            unsafe { std::env::remove_var(&self.name) };
        }
    }
}
