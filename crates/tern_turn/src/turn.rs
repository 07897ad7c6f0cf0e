use std::fmt;

use uuid::Uuid;

/// Correlates everything that belongs to a single turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TurnId(String);

impl TurnId {
    /// Generate a new, unique turn id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TurnId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Lifecycle state of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// No turn is active.
    Idle,

    /// The subscription is being opened.
    Opening,

    /// The subscription is open and generation was requested.
    Streaming,

    /// The turn is being committed and its resources released.
    Finalizing,

    /// The turn is over. Terminal.
    Closed,
}

/// Why a turn was finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeReason {
    /// The backend sent its completion signal.
    Done,

    /// The guard window elapsed without a single event for the turn.
    NoFirstEvent,

    /// The guard window elapsed after earlier activity.
    GuardTimeout,

    /// Tokens stopped arriving for the duration of the quiet window.
    QuietTimeout,

    /// A new turn was started before this one finished.
    Preempted,

    /// The coordinator was asked to close, or shut down.
    Closed,

    /// The subscription could not be opened.
    ConnectionFailed,

    /// The backend could not be asked to generate a reply.
    TriggerFailed,
}

impl FinalizeReason {
    /// Returns `true` if the buffered reply is committed when finalizing for
    /// this reason.
    #[must_use]
    pub fn commits(self) -> bool {
        !matches!(self, Self::ConnectionFailed | Self::TriggerFailed)
    }
}

impl fmt::Display for FinalizeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Done => "done event",
            Self::NoFirstEvent => "no first event (likely not subscribed/blocked)",
            Self::GuardTimeout => "no events within guard window",
            Self::QuietTimeout => "quiet finalize",
            Self::Preempted => "pre-empted by a new turn",
            Self::Closed => "closed",
            Self::ConnectionFailed => "connection failed",
            Self::TriggerFailed => "trigger request failed",
        })
    }
}
