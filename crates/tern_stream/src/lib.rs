//! Server-push event subscriptions for a single conversational turn.
//!
//! A [`StreamTransport`] owns one subscription to an event source, turns the
//! named push events it receives into [`StreamEvent`]s, and hands them to a
//! callback. The source itself sits behind the [`Connect`] trait: production
//! code uses [`HttpEventSource`]. The `mock` feature adds a scripted source
//! for tests.

mod error;
pub mod event;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod source;
mod transport;

pub use error::Error;
pub use event::{BotPayload, StreamEvent};
pub use source::{Connect, HttpEventSource, SourceItem, SourceStream};
pub use transport::{DEFAULT_RECONNECT, EventCallback, OpenOptions, Opening, StreamTransport};
