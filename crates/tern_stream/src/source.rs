use std::{fmt, pin::Pin};

use futures::{Stream, StreamExt as _};
use reqwest_eventsource::{Event, EventSource, retry::Constant};
use tracing::trace;
use url::Url;

use crate::{error::Result, transport::OpenOptions};

/// A raw item produced by an event source, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceItem {
    /// The channel is ready. May be repeated after a reconnect.
    Open,

    /// A push message. Unnamed messages carry the name `message`.
    Message { event: String, data: String },

    /// A transport error. Before the first [`SourceItem::Open`] this means
    /// the subscription could not be established.
    Error(String),
}

impl SourceItem {
    #[must_use]
    pub fn message(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Message {
            event: event.into(),
            data: data.into(),
        }
    }
}

pub type SourceStream = Pin<Box<dyn Stream<Item = SourceItem> + Send>>;

/// Connects to a server-push endpoint.
///
/// Dropping the returned stream must release the underlying connection.
pub trait Connect: fmt::Debug + Send + Sync {
    fn connect(&self, options: &OpenOptions) -> Result<SourceStream>;
}

/// Server-sent events over HTTP.
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    http_client: reqwest::Client,
    url: Url,
}

impl HttpEventSource {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            url,
        }
    }

    /// The subscription URL for the given options.
    #[must_use]
    pub fn subscription_url(&self, options: &OpenOptions) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("sender_id", &options.sender_id)
            .append_pair("cid", &options.correlation_id)
            .append_pair("reconnect_ms", &options.reconnect.as_millis().to_string());

        url
    }
}

impl Connect for HttpEventSource {
    fn connect(&self, options: &OpenOptions) -> Result<SourceStream> {
        let url = self.subscription_url(options);
        trace!(%url, "Connecting to event stream.");

        let mut source = EventSource::new(self.http_client.get(url))?;

        // The reconnect interval is a hint to both sides: the server receives
        // it as a query parameter, the client retries at that pace.
        source.set_retry_policy(Box::new(Constant::new(options.reconnect, None)));

        let stream = source.map(|item| match item {
            Ok(Event::Open) => SourceItem::Open,
            Ok(Event::Message(message)) => SourceItem::Message {
                event: message.event,
                data: message.data,
            },
            Err(error) => SourceItem::Error(error.to_string()),
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
