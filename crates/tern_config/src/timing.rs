//! Watchdog and transport timing.

use std::time::Duration;

use schematic::Config;
use serde::Serialize;

use crate::error::{Error, Result};

/// All values are in milliseconds.
#[derive(Debug, Clone, PartialEq, Config, Serialize)]
#[config(rename_all = "snake_case")]
pub struct TimingConfig {
    /// Maximum silence, across all events, before a turn is given up on.
    #[setting(default = 45_000)]
    pub guard_ms: u64,

    /// Silence after the last token before a turn is considered complete.
    ///
    /// Must not exceed `guard_ms`.
    #[setting(default = 10_000)]
    pub quiet_ms: u64,

    /// Reconnect interval hint for the event stream.
    #[setting(default = 2_000)]
    pub reconnect_ms: u64,

    /// Bound on the request that triggers generation.
    #[setting(default = 30_000)]
    pub trigger_timeout_ms: u64,
}

impl TimingConfig {
    #[must_use]
    pub fn guard(&self) -> Duration {
        Duration::from_millis(self.guard_ms)
    }

    #[must_use]
    pub fn quiet(&self) -> Duration {
        Duration::from_millis(self.quiet_ms)
    }

    #[must_use]
    pub fn reconnect(&self) -> Duration {
        Duration::from_millis(self.reconnect_ms)
    }

    #[must_use]
    pub fn trigger_timeout(&self) -> Duration {
        Duration::from_millis(self.trigger_timeout_ms)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("timing.guard_ms", self.guard_ms),
            ("timing.quiet_ms", self.quiet_ms),
            ("timing.trigger_timeout_ms", self.trigger_timeout_ms),
        ] {
            if value == 0 {
                return Err(Error::invalid(key, "must be greater than zero"));
            }
        }

        if self.quiet_ms > self.guard_ms {
            return Err(Error::invalid(
                "timing.quiet_ms",
                format!("must not exceed timing.guard_ms ({})", self.guard_ms),
            ));
        }

        Ok(())
    }
}
