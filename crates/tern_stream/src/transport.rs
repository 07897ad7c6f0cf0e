use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use futures::StreamExt as _;
use parking_lot::Mutex;
use tokio::{sync::oneshot, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    event::StreamEvent,
    source::{Connect, SourceItem, SourceStream},
};

/// Default interval between reconnection attempts.
pub const DEFAULT_RECONNECT: Duration = Duration::from_millis(2000);

/// Receives every event of an open subscription, in order.
pub type EventCallback = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Parameters of a single subscription attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    /// Stable identity of the conversation.
    pub sender_id: String,

    /// Identifies this particular subscription attempt.
    pub correlation_id: String,

    /// Advisory interval between reconnection attempts.
    pub reconnect: Duration,
}

impl OpenOptions {
    /// Options with a fresh correlation id and the default reconnect interval.
    #[must_use]
    pub fn new(sender_id: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            correlation_id: Uuid::new_v4().to_string(),
            reconnect: DEFAULT_RECONNECT,
        }
    }

    #[must_use]
    pub fn with_reconnect(mut self, reconnect: Duration) -> Self {
        self.reconnect = reconnect;
        self
    }
}

/// Owns one subscription to a server-push event source.
///
/// Events are normalized into [`StreamEvent`]s and handed to the callback
/// given at construction. A [`StreamEvent::Done`] is delivered at most once
/// per subscription. Once [`StreamTransport::close`] returns, the callback is
/// never invoked again for that subscription.
pub struct StreamTransport {
    connector: Arc<dyn Connect>,
    callback: EventCallback,
    subscription: Option<Subscription>,
}

struct Subscription {
    cancel: CancellationToken,
    pump: JoinHandle<()>,
    state: Arc<Mutex<Gate>>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Gate {
    #[default]
    Opening,
    Open,
    Closed,
}

impl StreamTransport {
    #[must_use]
    pub fn new(connector: Arc<dyn Connect>, callback: EventCallback) -> Self {
        Self {
            connector,
            callback,
            subscription: None,
        }
    }

    /// Open the subscription.
    ///
    /// The returned future resolves once the event source reports it is
    /// ready, and fails if the first connection attempt fails. Errors after
    /// that are delivered to the callback as [`StreamEvent::TransportError`].
    ///
    /// Any previous subscription held by this transport is closed first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(&mut self, options: &OpenOptions) -> Opening {
        self.close();

        let (ready_tx, ready_rx) = oneshot::channel();
        let stream = match self.connector.connect(options) {
            Ok(stream) => stream,
            Err(error) => {
                warn!(%error, "Unable to connect to event stream.");
                drop(ready_tx.send(Err(error)));
                return Opening(ready_rx);
            }
        };

        debug!(
            sender_id = options.sender_id,
            correlation_id = options.correlation_id,
            reconnect_ms = options.reconnect.as_millis(),
            "Opening event stream."
        );

        let cancel = CancellationToken::new();
        let state = Arc::new(Mutex::new(Gate::Opening));
        let pump = Pump {
            stream,
            callback: self.callback.clone(),
            cancel: cancel.clone(),
            state: state.clone(),
            ready: Some(ready_tx),
            done: false,
        };

        self.subscription = Some(Subscription {
            cancel,
            pump: tokio::spawn(pump.run()),
            state,
        });

        Opening(ready_rx)
    }

    /// Close the subscription.
    ///
    /// Safe to call at any time: before opening, while opening, or more than
    /// once. A pending [`Opening`] resolves to [`Error::Closed`].
    pub fn close(&mut self) {
        let Some(Subscription {
            cancel,
            pump,
            state,
        }) = self.subscription.take()
        else {
            return;
        };

        *state.lock() = Gate::Closed;
        cancel.cancel();
        pump.abort();

        debug!("Event stream closed.");
    }

    /// Returns `true` if the subscription has been opened and not yet closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|s| *s.state.lock() == Gate::Open)
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for StreamTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamTransport")
            .field("connector", &self.connector)
            .field(
                "state",
                &self.subscription.as_ref().map(|s| *s.state.lock()),
            )
            .finish_non_exhaustive()
    }
}

/// Resolves when a subscription is ready, or fails to open.
#[derive(Debug)]
#[must_use = "an opening subscription does nothing unless awaited"]
pub struct Opening(oneshot::Receiver<Result<()>>);

impl Future for Opening {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(Error::Closed)))
    }
}

/// Reads the source and forwards normalized events to the callback.
struct Pump {
    stream: SourceStream,
    callback: EventCallback,
    cancel: CancellationToken,
    state: Arc<Mutex<Gate>>,
    ready: Option<oneshot::Sender<Result<()>>>,
    done: bool,
}

impl Pump {
    async fn run(mut self) {
        loop {
            let item = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                item = self.stream.next() => item,
            };

            match item {
                Some(SourceItem::Open) => self.mark_open(),
                Some(SourceItem::Error(cause)) if self.ready.is_some() => {
                    warn!(%cause, "Event stream failed to open.");
                    self.fail(Error::Open(cause));
                    break;
                }
                Some(SourceItem::Error(cause)) => {
                    warn!(%cause, "Event stream error, waiting for reconnection.");
                    self.dispatch(StreamEvent::TransportError(cause));
                }
                Some(SourceItem::Message { event, data }) => {
                    // A message implies the channel is ready, even if the
                    // source never announced it.
                    if self.ready.is_some() {
                        self.mark_open();
                    }

                    trace!(event, data, "Received event.");
                    let event = StreamEvent::parse(&event, &data);
                    if event == StreamEvent::Done {
                        if self.done {
                            warn!("Duplicate done event ignored.");
                            continue;
                        }

                        self.done = true;
                    }

                    self.dispatch(event);
                }
                None if self.ready.is_some() => {
                    self.fail(Error::Ended);
                    break;
                }
                None => {
                    debug!("Event stream ended.");
                    break;
                }
            }
        }
    }

    fn mark_open(&mut self) {
        let Some(ready) = self.ready.take() else {
            debug!("Event stream reconnected.");
            return;
        };

        {
            let mut state = self.state.lock();
            if *state == Gate::Closed {
                return;
            }
            *state = Gate::Open;
        }

        debug!("Event stream opened.");
        drop(ready.send(Ok(())));
    }

    fn fail(&mut self, error: Error) {
        if let Some(ready) = self.ready.take() {
            drop(ready.send(Err(error)));
        }
    }

    fn dispatch(&self, event: StreamEvent) {
        // Hold the gate while invoking the callback, so `close` cannot return
        // while a callback is still running.
        let state = self.state.lock();
        if *state == Gate::Closed {
            trace!(event = event.name(), "Dropping event for closed stream.");
            return;
        }

        (self.callback)(event);
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
