//! Typed view of the push events sent by the backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single push event received for a turn.
///
/// Every named event the backend sends maps onto one of these variants.
/// Payloads that fail to parse are kept as text instead of being dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// An unnamed event, echoed back verbatim.
    UserEcho(String),

    /// An incremental text fragment of the bot reply.
    Token(String),

    /// A complete, non-incremental bot message.
    BotMessage(BotPayload),

    /// Diagnostic or progress information. Never part of the reply.
    Trace(Value),

    /// A keep-alive signal.
    Ping(Value),

    /// The backend finished generating the reply.
    Done,

    /// The transport reported an error after the subscription was opened.
    ///
    /// These are informational; the event source keeps reconnecting on its
    /// own.
    TransportError(String),

    /// A named event this client does not know about.
    Unknown { event: String, data: String },
}

impl StreamEvent {
    /// Build an event from the raw event name and data of a push message.
    #[must_use]
    pub fn parse(event: &str, data: &str) -> Self {
        match event {
            "" | "message" => Self::UserEcho(data.to_owned()),
            "token" => Self::Token(token_text(data)),
            "trace" => Self::Trace(json_or_text(data)),
            "ping" => Self::Ping(json_or_text(data)),
            "text" | "image" | "attachment" | "custom" => {
                Self::BotMessage(BotPayload::parse(event, data))
            }
            "done" => Self::Done,
            _ => Self::Unknown {
                event: event.to_owned(),
                data: data.to_owned(),
            },
        }
    }

    /// The name this event is known by on the wire.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::UserEcho(_) => "message",
            Self::Token(_) => "token",
            Self::BotMessage(payload) => payload.kind.as_deref().unwrap_or("text"),
            Self::Trace(_) => "trace",
            Self::Ping(_) => "ping",
            Self::Done => "done",
            Self::TransportError(_) => "error",
            Self::Unknown { event, .. } => event,
        }
    }

    /// Returns `true` if the event was pushed by the server, as opposed to
    /// being reported by the local transport.
    #[must_use]
    pub fn is_server_push(&self) -> bool {
        !matches!(self, Self::TransportError(_))
    }
}

/// Payload of a complete bot message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotPayload {
    /// The event name the payload arrived with, if known.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Value>,

    /// Identity of the assistant that produced the message.
    ///
    /// Messages without one may be echoes of the user's own input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<Value>,
}

impl BotPayload {
    fn parse(event: &str, data: &str) -> Self {
        let data = if data.trim().is_empty() { "{}" } else { data };

        let mut payload = serde_json::from_str::<Self>(data).unwrap_or_else(|_| Self {
            text: Some(data.to_owned()),
            ..Default::default()
        });

        if payload.kind.is_none() {
            payload.kind = Some(event.to_owned());
        }

        payload
    }

    /// Create a plain text payload.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: Some("text".to_owned()),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Returns `true` if the payload names the assistant that produced it.
    #[must_use]
    pub fn has_assistant_id(&self) -> bool {
        match &self.assistant_id {
            None | Some(Value::Null) => false,
            Some(Value::String(id)) => !id.is_empty(),
            Some(_) => true,
        }
    }

    /// The non-empty text of the payload, if any.
    #[must_use]
    pub fn non_empty_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.is_empty())
    }

    /// Structured content that is neither text nor an image.
    #[must_use]
    pub fn structured(&self) -> Option<&Value> {
        self.attachment.as_ref().or(self.custom.as_ref())
    }
}

/// Token payloads are either `{"text": ..}`, `{"token": ..}` or a raw
/// string.
fn token_text(data: &str) -> String {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(map)) => map
            .get("text")
            .filter(|v| !v.is_null())
            .or_else(|| map.get("token"))
            .map(|v| match v {
                Value::String(text) => text.clone(),
                Value::Null => String::new(),
                v => v.to_string(),
            })
            .unwrap_or_default(),
        Ok(Value::String(text)) => text,
        _ => data.to_owned(),
    }
}

fn json_or_text(data: &str) -> Value {
    if data.trim().is_empty() {
        return Value::Object(serde_json::Map::new());
    }

    serde_json::from_str(data).unwrap_or_else(|_| Value::String(data.to_owned()))
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
