use std::io;

use tern_turn::FinalizeReason;

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] tern_config::Error),

    #[error("Turn error: {0}")]
    Turn(#[from] tern_turn::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Turn failed: {0}")]
    TurnFailed(FinalizeReason),
}
