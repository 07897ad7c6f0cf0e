use serde_json::Value;
use tern_stream::BotPayload;

use crate::{
    conversation::Message,
    error::TurnError,
    turn::{FinalizeReason, TurnId},
};

/// Everything the coordinator reports to its consumer.
///
/// Notices for a turn arrive in the order the coordinator processed them.
/// Partial text carried by [`Notice::Token`] is transient; the message in
/// [`Notice::Committed`] is authoritative.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Sending was locked (`true`) or released (`false`).
    Sending(bool),

    UserEcho { turn: TurnId, text: String },
    Token { turn: TurnId, text: String },
    BotMessage { turn: TurnId, payload: BotPayload },
    Trace { turn: TurnId, info: Value },
    Ping { turn: TurnId, info: Value },
    Done { turn: TurnId },
    Error { turn: TurnId, error: TurnError },

    /// A complete message that repeated the user's input was dropped.
    EchoSuppressed { turn: TurnId, text: String },

    /// A message was added to the conversation outside of the final commit.
    Published { turn: TurnId, message: Message },

    /// The reply of the turn was committed to the conversation.
    Committed { turn: TurnId, message: Message },

    /// The turn is over.
    Finalized {
        turn: TurnId,
        reason: FinalizeReason,
        committed: bool,
    },
}

impl Notice {
    /// The turn this notice belongs to, if any.
    #[must_use]
    pub fn turn(&self) -> Option<&TurnId> {
        match self {
            Self::Sending(_) => None,
            Self::UserEcho { turn, .. }
            | Self::Token { turn, .. }
            | Self::BotMessage { turn, .. }
            | Self::Trace { turn, .. }
            | Self::Ping { turn, .. }
            | Self::Done { turn }
            | Self::Error { turn, .. }
            | Self::EchoSuppressed { turn, .. }
            | Self::Published { turn, .. }
            | Self::Committed { turn, .. }
            | Self::Finalized { turn, .. } => Some(turn),
        }
    }

    /// One-line rendering for a process log, if the notice is informational.
    #[must_use]
    pub fn process_line(&self) -> Option<String> {
        let line = match self {
            Self::UserEcho { text, .. } => format!("> {text}"),
            Self::Trace { info, .. } => format!("[trace] {info}"),
            Self::Error {
                error: error @ TurnError::TriggerRequest(_),
                ..
            } => format!("[http-error] {error}"),
            Self::Error { error, .. } => format!("[sse-error] {error}"),
            Self::EchoSuppressed { .. } => "[skip] echo".to_owned(),
            Self::Finalized { reason, .. } => format!("[finalize] {reason}"),
            _ => return None,
        };

        Some(line)
    }
}
