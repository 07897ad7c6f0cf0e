use schematic::Config;
use serde::Serialize;
use serde_json::{Map, Value};

/// Trigger request configuration.
#[derive(Debug, Clone, PartialEq, Config, Serialize)]
#[config(rename_all = "snake_case")]
pub struct TriggerConfig {
    /// Extra metadata sent with every trigger request.
    ///
    /// Keys set here take precedence over the generated `gen_id`.
    pub metadata: Map<String, Value>,
}
