pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot build subscription request: {0}")]
    Request(#[from] reqwest_eventsource::CannotCloneRequestError),

    #[error("failed to open event stream: {0}")]
    Open(String),

    #[error("event stream ended before it was opened")]
    Ended,

    #[error("event stream was closed before it was opened")]
    Closed,
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
