use std::{sync::Arc, time::Duration};

use serde_json::{Map, Value, json};
use tern_stream::{BotPayload, Connect, EventCallback, OpenOptions, StreamEvent, StreamTransport};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use crate::{
    accumulator::{TextAccumulator, normalize},
    conversation::{Conversation, Message},
    error::{Error, Result, TurnError},
    notice::Notice,
    trigger::{Trigger, TriggerRequest},
    turn::{FinalizeReason, TurnId, TurnState},
    watchdog::{Deadline, Expiry, Watchdog},
};

/// Default maximum silence before a turn is given up on.
pub const DEFAULT_GUARD: Duration = Duration::from_secs(45);

/// Default silence after tokens stopped arriving before a turn is
/// considered complete.
pub const DEFAULT_QUIET: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Stable identity of the conversation.
    pub sender_id: String,

    pub guard: Duration,
    pub quiet: Duration,

    /// Reconnect interval passed to the event source.
    pub reconnect: Duration,

    /// Extra metadata sent with every trigger request.
    pub metadata: Map<String, Value>,
}

impl CoordinatorConfig {
    #[must_use]
    pub fn new(sender_id: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            guard: DEFAULT_GUARD,
            quiet: DEFAULT_QUIET,
            reconnect: tern_stream::DEFAULT_RECONNECT,
            metadata: Map::new(),
        }
    }

    #[must_use]
    pub fn with_guard(mut self, guard: Duration) -> Self {
        self.guard = guard;
        self
    }

    #[must_use]
    pub fn with_quiet(mut self, quiet: Duration) -> Self {
        self.quiet = quiet;
        self
    }

    #[must_use]
    pub fn with_reconnect(mut self, reconnect: Duration) -> Self {
        self.reconnect = reconnect;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Point-in-time view of the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The active turn, or the last one if none is active.
    pub turn: Option<TurnId>,
    pub state: TurnState,

    /// Whether a turn is in flight.
    pub sending: bool,
    pub got_first_event: bool,

    /// Buffered reply of the active turn.
    pub text: String,
    pub committed: bool,
}

#[derive(Debug)]
enum Command {
    Send {
        text: String,
        reply: oneshot::Sender<Result<TurnId>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    Conversation {
        reply: oneshot::Sender<Conversation>,
    },
}

/// A message posted back to the coordinator by one of its helpers.
#[derive(Debug)]
struct Inbound {
    turn: TurnId,
    signal: Signal,
}

#[derive(Debug)]
enum Signal {
    Opened(std::result::Result<(), tern_stream::Error>),
    Event(StreamEvent),
    Triggered(Result<()>),
}

/// The active turn.
#[derive(Debug)]
struct Turn {
    id: TurnId,

    /// The trimmed user input that started the turn.
    text: String,
    state: TurnState,
    got_first_event: bool,
    transport: StreamTransport,
}

/// Drives one turn at a time from `send` to finalize.
///
/// All state is owned by a single task, see [`TurnCoordinator::spawn`].
/// Subscriptions, open waits and trigger requests run as helper tasks that
/// post tagged messages back to it; messages for any turn other than the
/// active one are dropped.
#[derive(Debug)]
pub struct TurnCoordinator {
    config: CoordinatorConfig,
    connector: Arc<dyn Connect>,
    trigger: Arc<dyn Trigger>,

    notices: mpsc::UnboundedSender<Notice>,
    inbox_tx: mpsc::UnboundedSender<Inbound>,
    inbox: mpsc::UnboundedReceiver<Inbound>,

    watchdog: Watchdog<TurnId>,
    accumulator: TextAccumulator,
    conversation: Conversation,

    turn: Option<Turn>,
    last: Option<TurnId>,
}

impl TurnCoordinator {
    /// Create a coordinator, and the receiving end of its notices.
    #[must_use]
    pub fn new(
        config: CoordinatorConfig,
        connector: Arc<dyn Connect>,
        trigger: Arc<dyn Trigger>,
    ) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notices, notices_rx) = mpsc::unbounded_channel();
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let watchdog = Watchdog::new(config.guard, config.quiet);

        let coordinator = Self {
            config,
            connector,
            trigger,
            notices,
            inbox_tx,
            inbox,
            watchdog,
            accumulator: TextAccumulator::new(),
            conversation: Conversation::new(),
            turn: None,
            last: None,
        };

        (coordinator, notices_rx)
    }

    /// Run the coordinator on its own task.
    ///
    /// The coordinator stops once every handle is dropped, closing the
    /// active turn.
    #[must_use]
    pub fn spawn(self) -> CoordinatorHandle {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(self.run(rx));

        CoordinatorHandle { commands }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        debug!(sender_id = self.config.sender_id, "Turn coordinator started.");

        loop {
            let deadline = Watchdog::wait(self.watchdog.next_deadline());

            tokio::select! {
                biased;
                Some(inbound) = self.inbox.recv() => self.handle_inbound(inbound),
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                deadline = deadline => self.handle_expiry(&deadline),
            }
        }

        self.finalize(FinalizeReason::Closed);
        debug!("Turn coordinator stopped.");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send { text, reply } => drop(reply.send(self.send(&text))),
            Command::Close { reply } => {
                self.finalize(FinalizeReason::Closed);
                drop(reply.send(()));
            }
            Command::Snapshot { reply } => drop(reply.send(self.snapshot())),
            Command::Conversation { reply } => drop(reply.send(self.conversation.clone())),
        }
    }

    fn send(&mut self, text: &str) -> Result<TurnId> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyMessage);
        }

        // Retire the previous turn before anything of the new one exists.
        self.finalize(FinalizeReason::Preempted);

        let id = TurnId::new();
        self.conversation.push(Message::user(id.clone(), text));
        self.accumulator.begin(id.clone());
        self.watchdog.start(id.clone());

        let inbox = self.inbox_tx.clone();
        let turn = id.clone();
        let callback: EventCallback = Arc::new(move |event| {
            drop(inbox.send(Inbound {
                turn: turn.clone(),
                signal: Signal::Event(event),
            }));
        });

        let mut transport = StreamTransport::new(self.connector.clone(), callback);
        let options = OpenOptions::new(self.config.sender_id.clone())
            .with_reconnect(self.config.reconnect);
        let opening = transport.open(&options);

        let inbox = self.inbox_tx.clone();
        let turn = id.clone();
        tokio::spawn(async move {
            let result = opening.await;
            drop(inbox.send(Inbound {
                turn,
                signal: Signal::Opened(result),
            }));
        });

        debug!(
            turn = %id,
            correlation_id = options.correlation_id,
            "Turn started."
        );

        self.turn = Some(Turn {
            id: id.clone(),
            text: text.to_owned(),
            state: TurnState::Opening,
            got_first_event: false,
            transport,
        });
        self.notify(Notice::Sending(true));

        Ok(id)
    }

    fn handle_inbound(&mut self, Inbound { turn, signal }: Inbound) {
        if !self.is_active(&turn) {
            trace!(%turn, ?signal, "Dropping message for inactive turn.");
            return;
        }

        match signal {
            Signal::Opened(result) => self.on_opened(result),
            Signal::Event(event) => self.on_event(event),
            Signal::Triggered(Ok(())) => debug!(%turn, "Generation triggered."),
            Signal::Triggered(Err(error)) => {
                self.fail(
                    TurnError::TriggerRequest(error.to_string()),
                    FinalizeReason::TriggerFailed,
                );
            }
        }
    }

    fn on_opened(&mut self, result: std::result::Result<(), tern_stream::Error>) {
        let Some(turn) = self.turn.as_mut() else {
            return;
        };

        if turn.state != TurnState::Opening {
            return;
        }

        if let Err(error) = result {
            let cause = match error {
                tern_stream::Error::Open(cause) => cause,
                error => error.to_string(),
            };

            self.fail(TurnError::ConnectionOpen(cause), FinalizeReason::ConnectionFailed);
            return;
        }

        turn.state = TurnState::Streaming;
        debug!(turn = %turn.id, "Event stream ready, triggering generation.");

        let request = TriggerRequest::new(
            self.config.sender_id.clone(),
            turn.text.clone(),
            &turn.id,
            &self.config.metadata,
        );
        let trigger = self.trigger.clone();
        let inbox = self.inbox_tx.clone();
        let id = turn.id.clone();

        tokio::spawn(async move {
            let result = trigger.trigger(&request).await;
            drop(inbox.send(Inbound {
                turn: id,
                signal: Signal::Triggered(result),
            }));
        });
    }

    fn on_event(&mut self, event: StreamEvent) {
        let Some(turn) = self.turn.as_mut() else {
            return;
        };

        if !matches!(turn.state, TurnState::Opening | TurnState::Streaming) {
            return;
        }

        let id = turn.id.clone();
        trace!(turn = %id, event = event.name(), "Handling event.");

        // Transport errors keep the turn alive, but do not count as hearing
        // from the server.
        self.watchdog.kick_guard(&id);
        if event.is_server_push() {
            turn.got_first_event = true;
        }

        match event {
            StreamEvent::UserEcho(text) => self.notify(Notice::UserEcho { turn: id, text }),
            StreamEvent::Token(text) => {
                self.watchdog.kick_quiet(&id);
                if self.accumulator.append(&id, &text) {
                    self.notify(Notice::Token { turn: id, text });
                }
            }
            StreamEvent::BotMessage(payload) => self.on_bot_message(id, payload),
            StreamEvent::Trace(info) => self.notify(Notice::Trace { turn: id, info }),
            StreamEvent::Ping(info) => self.notify(Notice::Ping { turn: id, info }),
            StreamEvent::Done => {
                self.notify(Notice::Done { turn: id });
                self.finalize(FinalizeReason::Done);
            }
            StreamEvent::TransportError(cause) => {
                warn!(turn = %id, %cause, "Event stream error, leaving liveness to the watchdog.");
                self.notify(Notice::Error {
                    turn: id,
                    error: TurnError::RuntimeStream(cause),
                });
            }
            StreamEvent::Unknown { event, data } => {
                debug!(turn = %id, event, "Forwarding unknown event.");
                self.notify(Notice::Trace {
                    turn: id,
                    info: json!({ "event": event, "data": data }),
                });
            }
        }
    }

    fn on_bot_message(&mut self, id: TurnId, payload: BotPayload) {
        let user_text = self.turn.as_ref().map(|t| t.text.as_str()).unwrap_or_default();

        if let Some(text) = payload.non_empty_text() {
            if !payload.has_assistant_id() && text.trim() == user_text {
                debug!(turn = %id, "Skipping echo of user input.");
                self.notify(Notice::EchoSuppressed {
                    turn: id,
                    text: text.to_owned(),
                });
                return;
            }
        }

        self.notify(Notice::BotMessage {
            turn: id.clone(),
            payload: payload.clone(),
        });

        if let Some(text) = payload.non_empty_text() {
            // A complete message takes over a streaming reply, otherwise it
            // stands on its own.
            if self.accumulator.has_placeholder() && self.accumulator.replace(&id, text) {
                debug!(turn = %id, "Streamed reply replaced by complete message.");
                return;
            }

            let text = normalize(text);
            if !text.is_empty() {
                self.publish(Message::assistant(id, text));
            }
        } else if let Some(image) = payload.image.as_deref() {
            self.publish(Message::image(id, image));
        } else if let Some(structured) = payload.structured() {
            self.notify(Notice::Trace {
                turn: id,
                info: structured.clone(),
            });
        }
    }

    fn publish(&mut self, message: Message) {
        self.conversation.push(message.clone());
        self.notify(Notice::Published {
            turn: message.turn.clone(),
            message,
        });
    }

    fn handle_expiry(&mut self, deadline: &Deadline<TurnId>) {
        let Some(turn) = self.turn.as_ref().filter(|t| t.id == deadline.owner) else {
            trace!(turn = %deadline.owner, "Ignoring stale expiry.");
            return;
        };

        match deadline.expiry {
            Expiry::Guard => {
                let reason = if turn.got_first_event {
                    FinalizeReason::GuardTimeout
                } else {
                    FinalizeReason::NoFirstEvent
                };

                warn!(turn = %turn.id, %reason, "Guard window elapsed.");
                self.finalize(reason);
            }
            Expiry::Quiet if turn.got_first_event => {
                debug!(turn = %turn.id, "Quiet window elapsed.");
                self.finalize(FinalizeReason::QuietTimeout);
            }
            Expiry::Quiet => self.watchdog.disarm(Expiry::Quiet),
        }
    }

    /// Surface a fatal error for the active turn, then finalize it.
    fn fail(&mut self, error: TurnError, reason: FinalizeReason) {
        let Some(turn) = self.turn.as_ref() else {
            return;
        };

        error!(turn = %turn.id, %error, "Turn failed.");
        self.notify(Notice::Error {
            turn: turn.id.clone(),
            error,
        });

        self.finalize(reason);
    }

    /// Finalize the active turn, if any.
    ///
    /// Taking the turn out of `self` is what makes this happen at most once
    /// per turn.
    fn finalize(&mut self, reason: FinalizeReason) {
        let Some(mut turn) = self.turn.take() else {
            return;
        };

        turn.state = TurnState::Finalizing;
        self.watchdog.clear();
        turn.transport.close();

        let message = if reason.commits() {
            self.accumulator
                .commit(&turn.id, None, &mut self.conversation)
        } else {
            None
        };
        self.accumulator.retire(&turn.id);
        turn.state = TurnState::Closed;

        info!(turn = %turn.id, %reason, committed = message.is_some(), "Turn finalized.");

        let committed = message.is_some();
        if let Some(message) = message {
            self.notify(Notice::Committed {
                turn: turn.id.clone(),
                message,
            });
        }

        self.notify(Notice::Finalized {
            turn: turn.id.clone(),
            reason,
            committed,
        });
        self.notify(Notice::Sending(false));

        self.last = Some(turn.id);
    }

    fn snapshot(&self) -> Snapshot {
        if let Some(turn) = &self.turn {
            return Snapshot {
                turn: Some(turn.id.clone()),
                state: turn.state,
                sending: true,
                got_first_event: turn.got_first_event,
                text: self
                    .accumulator
                    .text(&turn.id)
                    .unwrap_or_default()
                    .to_owned(),
                committed: self.accumulator.is_committed(&turn.id),
            };
        }

        Snapshot {
            turn: self.last.clone(),
            state: if self.last.is_some() {
                TurnState::Closed
            } else {
                TurnState::Idle
            },
            sending: false,
            got_first_event: false,
            text: String::new(),
            committed: self
                .last
                .as_ref()
                .is_some_and(|id| self.accumulator.is_committed(id)),
        }
    }

    fn is_active(&self, turn: &TurnId) -> bool {
        self.turn.as_ref().is_some_and(|t| &t.id == turn)
    }

    fn notify(&self, notice: Notice) {
        drop(self.notices.send(notice));
    }
}

/// Cloneable handle to a running [`TurnCoordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl CoordinatorHandle {
    /// Start a new turn for `text`, pre-empting the active one.
    ///
    /// Returns as soon as the turn started. Its progress is reported
    /// through notices.
    pub async fn send(&self, text: impl Into<String>) -> Result<TurnId> {
        let text = text.into();
        self.request(|reply| Command::Send { text, reply }).await?
    }

    /// Finalize the active turn, if any.
    pub async fn close(&self) -> Result<()> {
        self.request(|reply| Command::Close { reply }).await
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// A copy of the conversation so far.
    pub async fn conversation(&self) -> Result<Conversation> {
        self.request(|reply| Command::Conversation { reply }).await
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| Error::Shutdown)?;

        rx.await.map_err(|_| Error::Shutdown)
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
