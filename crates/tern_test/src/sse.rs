//! Builders for `text/event-stream` response bodies.

use std::fmt::Write as _;

/// A server-sent events body, built event by event.
#[derive(Debug, Default, Clone)]
pub struct SseBody {
    body: String,
}

impl SseBody {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named event. Multi-line data is split over several `data:`
    /// fields.
    #[must_use]
    pub fn event(mut self, event: &str, data: &str) -> Self {
        let _ = writeln!(self.body, "event: {event}");
        self.data(data)
    }

    /// Append an unnamed event.
    #[must_use]
    pub fn message(self, data: &str) -> Self {
        self.data(data)
    }

    #[must_use]
    pub fn token(self, text: &str) -> Self {
        let data = serde_json::json!({ "text": text }).to_string();
        self.event("token", &data)
    }

    #[must_use]
    pub fn done(self) -> Self {
        self.event("done", "{}")
    }

    /// Append a comment line, as servers do for keep-alives.
    #[must_use]
    pub fn comment(mut self, comment: &str) -> Self {
        let _ = writeln!(self.body, ": {comment}");
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        self.body
    }

    fn data(mut self, data: &str) -> Self {
        if data.is_empty() {
            self.body.push_str("data:\n");
        }

        for line in data.lines() {
            let _ = writeln!(self.body, "data: {line}");
        }

        self.body.push('\n');
        self
    }
}
