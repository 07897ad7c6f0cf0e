//! Lifecycle of a single streamed chat turn.
//!
//! For every user message, the [`TurnCoordinator`] opens a server-push
//! subscription, triggers generation on the backend, accumulates the
//! streamed reply and finalizes the turn exactly once: on the explicit
//! completion signal, on a watchdog timeout, or on failure.

mod accumulator;
pub mod conversation;
mod coordinator;
mod error;
#[cfg(test)]
mod mock;
mod notice;
mod trigger;
mod turn;
mod watchdog;

pub use accumulator::TextAccumulator;
pub use conversation::{Content, Conversation, Message, Role};
pub use coordinator::{CoordinatorConfig, CoordinatorHandle, Snapshot, TurnCoordinator};
pub use error::{Error, TurnError};
pub use notice::Notice;
pub use trigger::{Trigger, TriggerDispatcher, TriggerRequest};
pub use turn::{FinalizeReason, TurnId, TurnState};
pub use watchdog::{Deadline, Expiry, Watchdog};
