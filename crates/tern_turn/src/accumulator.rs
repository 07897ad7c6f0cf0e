use tracing::{debug, trace};

use crate::{
    conversation::{Conversation, Message},
    turn::TurnId,
};

/// Buffers the streamed reply of the active turn.
///
/// Only the active turn can write to the buffer or be committed; anything
/// for another turn is dropped. Each turn is committed at most once.
///
/// Commit state is kept for the active turn and the most recently committed
/// one only.
#[derive(Debug, Default)]
pub struct TextAccumulator {
    active: Option<TurnId>,
    buffer: String,

    /// The buffer was overwritten by a complete message.
    replaced: bool,

    /// Partial text is being shown for the active turn.
    placeholder: bool,

    /// The active turn was committed.
    committed: bool,

    last_committed: Option<TurnId>,
}

impl TextAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `turn` the active turn, with an empty buffer.
    pub fn begin(&mut self, turn: TurnId) {
        self.active = Some(turn);
        self.buffer.clear();
        self.replaced = false;
        self.placeholder = false;
        self.committed = false;
    }

    /// Stop accepting text for `turn`, if it is the active turn.
    pub fn retire(&mut self, turn: &TurnId) {
        if self.is_active(turn) {
            self.active = None;
            self.buffer.clear();
            self.replaced = false;
            self.placeholder = false;
            self.committed = false;
        }
    }

    #[must_use]
    pub fn is_active(&self, turn: &TurnId) -> bool {
        self.active.as_ref() == Some(turn)
    }

    /// Append a streamed fragment.
    ///
    /// Returns `false` if the fragment was dropped, because `turn` is not
    /// active or its buffer was already replaced by a complete message.
    pub fn append(&mut self, turn: &TurnId, fragment: &str) -> bool {
        if !self.is_active(turn) {
            trace!(%turn, "Dropping fragment for inactive turn.");
            return false;
        }

        if self.replaced {
            trace!(%turn, "Dropping fragment after complete message.");
            return false;
        }

        self.placeholder = true;
        self.buffer.push_str(fragment);
        true
    }

    /// Replace the buffer with a complete message.
    ///
    /// Allowed once per turn. Returns `false` if `turn` is not active or was
    /// already replaced.
    pub fn replace(&mut self, turn: &TurnId, text: &str) -> bool {
        if !self.is_active(turn) || self.replaced {
            return false;
        }

        text.clone_into(&mut self.buffer);
        self.replaced = true;
        self.placeholder = false;
        true
    }

    /// The buffered text of `turn`, if it is active.
    #[must_use]
    pub fn text(&self, turn: &TurnId) -> Option<&str> {
        self.is_active(turn).then_some(self.buffer.as_str())
    }

    /// Returns `true` while partial text is streaming for the active turn.
    #[must_use]
    pub fn has_placeholder(&self) -> bool {
        self.placeholder
    }

    #[must_use]
    pub fn is_replaced(&self) -> bool {
        self.replaced
    }

    #[must_use]
    pub fn is_committed(&self, turn: &TurnId) -> bool {
        (self.is_active(turn) && self.committed) || self.last_committed.as_ref() == Some(turn)
    }

    /// Publish the reply of `turn` to the conversation.
    ///
    /// The published text is `override_text` if given, the buffer otherwise,
    /// with line endings unified and surrounding whitespace trimmed. Nothing
    /// is published if `turn` is not active, was committed before, or the
    /// text is empty.
    pub fn commit(
        &mut self,
        turn: &TurnId,
        override_text: Option<&str>,
        conversation: &mut Conversation,
    ) -> Option<Message> {
        if !self.is_active(turn) {
            trace!(%turn, "Not committing inactive turn.");
            return None;
        }

        if self.committed {
            debug!(%turn, "Turn already committed.");
            return None;
        }

        let text = normalize(override_text.unwrap_or(self.buffer.as_str()));
        if text.is_empty() {
            debug!(%turn, "Nothing to commit.");
            return None;
        }

        let message = Message::assistant(turn.clone(), text);
        conversation.push(message.clone());
        self.committed = true;
        self.placeholder = false;
        self.last_committed = Some(turn.clone());

        debug!(%turn, "Turn committed.");
        Some(message)
    }
}

/// Unify line endings to `\n` and trim surrounding whitespace.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_owned()
}

#[cfg(test)]
#[path = "accumulator_tests.rs"]
mod tests;
