//! The in-memory conversation that finalized turns are committed to.

use crate::turn::TurnId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),

    /// An image, referenced by URL.
    Image(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub turn: TurnId,
    pub role: Role,
    pub content: Content,
}

impl Message {
    #[must_use]
    pub fn user(turn: TurnId, text: impl Into<String>) -> Self {
        Self {
            turn,
            role: Role::User,
            content: Content::Text(text.into()),
        }
    }

    #[must_use]
    pub fn assistant(turn: TurnId, text: impl Into<String>) -> Self {
        Self {
            turn,
            role: Role::Assistant,
            content: Content::Text(text.into()),
        }
    }

    #[must_use]
    pub fn image(turn: TurnId, url: impl Into<String>) -> Self {
        Self {
            turn,
            role: Role::Assistant,
            content: Content::Image(url.into()),
        }
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            Content::Image(_) => None,
        }
    }
}

/// Ordered list of user and assistant messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Assistant messages published for `turn`, in order.
    pub fn replies<'a>(&'a self, turn: &'a TurnId) -> impl Iterator<Item = &'a Message> + 'a {
        self.messages
            .iter()
            .filter(move |m| m.role == Role::Assistant && &m.turn == turn)
    }
}
