pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot send an empty message")]
    EmptyMessage,

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {}): {}", .code, .message)]
    Api { code: u16, message: String },

    #[error("Stream error: {0}")]
    Stream(#[from] tern_stream::Error),

    #[error("turn coordinator is not running")]
    Shutdown,
}

#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        if std::mem::discriminant(self) != std::mem::discriminant(other) {
            return false;
        }

        // Good enough for testing purposes
        format!("{self:?}") == format!("{other:?}")
    }
}

/// A failure surfaced to the user for a specific turn.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    /// The subscription could not be opened. Fatal to the turn.
    #[error("unable to open event stream: {0}")]
    ConnectionOpen(String),

    /// The subscription errored after opening. The event source reconnects
    /// on its own.
    #[error("event stream error: {0}")]
    RuntimeStream(String),

    /// The backend was never asked to generate. Fatal to the turn.
    #[error("trigger request failed: {0}")]
    TriggerRequest(String),
}

impl TurnError {
    /// Returns `true` if the error ends the turn.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::RuntimeStream(_))
    }
}
