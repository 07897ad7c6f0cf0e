//! Scripted trigger for tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    error::{Error, Result},
    trigger::{Trigger, TriggerRequest},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Outcome {
    #[default]
    Accept,
    Reject(String),
    Hang,
}

/// An in-memory [`Trigger`] that records every request it receives.
#[derive(Debug, Clone, Default)]
pub struct MockTrigger {
    requests: Arc<Mutex<Vec<TriggerRequest>>>,
    outcome: Arc<Mutex<Outcome>>,
}

impl MockTrigger {
    /// A trigger that accepts every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept following requests.
    pub fn accept(&self) {
        *self.outcome.lock() = Outcome::Accept;
    }

    /// Fail following requests with a server error.
    pub fn reject(&self, message: impl Into<String>) {
        *self.outcome.lock() = Outcome::Reject(message.into());
    }

    /// Never complete following requests.
    pub fn hang(&self) {
        *self.outcome.lock() = Outcome::Hang;
    }

    #[must_use]
    pub fn requests(&self) -> Vec<TriggerRequest> {
        self.requests.lock().clone()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Trigger for MockTrigger {
    async fn trigger(&self, request: &TriggerRequest) -> Result<()> {
        self.requests.lock().push(request.clone());

        let outcome = self.outcome.lock().clone();
        match outcome {
            Outcome::Accept => Ok(()),
            Outcome::Reject(message) => Err(Error::Api { code: 500, message }),
            Outcome::Hang => std::future::pending().await,
        }
    }
}
