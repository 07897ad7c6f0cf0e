//! Scripted event source for tests.
//!
//! Every call to [`Connect::connect`] creates a new [`MockConnection`], which
//! tests use to push items into the stream as if they came from the server.
//!
//! ```ignore
//! let source = MockSource::new();
//! let mut transport = StreamTransport::new(Arc::new(source.clone()), callback);
//! let opening = transport.open(&OpenOptions::new("user_1"));
//!
//! let connection = source.connection(0);
//! connection.open();
//! connection.token("Hello");
//! connection.done();
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::{
    error::{Error, Result},
    source::{Connect, SourceItem, SourceStream},
    transport::OpenOptions,
};

/// An in-memory [`Connect`] implementation.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    connections: Arc<Mutex<Vec<MockConnection>>>,
    refuse: Arc<Mutex<Option<String>>>,
}

impl MockSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `connect` call fail synchronously.
    pub fn refuse(&self, reason: impl Into<String>) {
        *self.refuse.lock() = Some(reason.into());
    }

    /// The connection created by the `index`-th `connect` call.
    ///
    /// # Panics
    ///
    /// Panics if fewer connections were made.
    #[must_use]
    pub fn connection(&self, index: usize) -> MockConnection {
        self.connections
            .lock()
            .get(index)
            .cloned()
            .unwrap_or_else(|| panic!("no connection with index {index}"))
    }

    /// The most recent connection, if any.
    #[must_use]
    pub fn last_connection(&self) -> Option<MockConnection> {
        self.connections.lock().last().cloned()
    }

    /// Number of `connect` calls made so far.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }
}

impl Connect for MockSource {
    fn connect(&self, options: &OpenOptions) -> Result<SourceStream> {
        if let Some(reason) = self.refuse.lock().clone() {
            return Err(Error::Open(reason));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.lock().push(MockConnection {
            options: options.clone(),
            tx,
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

/// The server side of a single mock subscription.
#[derive(Debug, Clone)]
pub struct MockConnection {
    options: OpenOptions,
    tx: mpsc::UnboundedSender<SourceItem>,
}

impl MockConnection {
    /// The options the subscription was opened with.
    #[must_use]
    pub fn options(&self) -> &OpenOptions {
        &self.options
    }

    /// Push a raw item. Returns `false` if the subscriber released the
    /// connection.
    pub fn push(&self, item: SourceItem) -> bool {
        self.tx.send(item).is_ok()
    }

    pub fn open(&self) -> bool {
        self.push(SourceItem::Open)
    }

    pub fn event(&self, event: &str, data: &str) -> bool {
        self.push(SourceItem::message(event, data))
    }

    pub fn echo(&self, text: &str) -> bool {
        self.event("message", text)
    }

    pub fn token(&self, text: &str) -> bool {
        let data = serde_json::json!({ "text": text }).to_string();
        self.event("token", &data)
    }

    pub fn ping(&self) -> bool {
        self.event("ping", "{}")
    }

    pub fn done(&self) -> bool {
        self.event("done", "{}")
    }

    pub fn error(&self, cause: &str) -> bool {
        self.push(SourceItem::Error(cause.to_owned()))
    }

    /// Returns `true` once the subscriber dropped its end of the stream.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.tx.is_closed()
    }
}
