use std::time::Duration;

use tokio::time::{Instant, sleep_until};

/// Which of the two windows elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Maximum silence across all event kinds.
    Guard,

    /// Silence after tokens started flowing.
    Quiet,
}

/// An armed deadline, tagged with the owner that armed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deadline<K> {
    pub owner: K,
    pub expiry: Expiry,
    pub at: Instant,
}

/// Two independently re-armable timeout windows.
///
/// The watchdog belongs to one owner at a time. Re-arming on behalf of any
/// other owner, or after [`Watchdog::clear`], does nothing.
#[derive(Debug)]
pub struct Watchdog<K> {
    guard_window: Duration,
    quiet_window: Duration,
    owner: Option<K>,
    guard: Option<Instant>,
    quiet: Option<Instant>,
}

impl<K: Clone + PartialEq> Watchdog<K> {
    #[must_use]
    pub fn new(guard_window: Duration, quiet_window: Duration) -> Self {
        Self {
            guard_window,
            quiet_window,
            owner: None,
            guard: None,
            quiet: None,
        }
    }

    /// Hand the watchdog to `owner` and arm the guard window.
    ///
    /// Any deadline armed for a previous owner is discarded.
    pub fn start(&mut self, owner: K) {
        self.owner = Some(owner);
        self.quiet = None;
        self.guard = Some(Instant::now() + self.guard_window);
    }

    /// Re-arm the guard window.
    pub fn kick_guard(&mut self, owner: &K) {
        if self.owns(owner) {
            self.guard = Some(Instant::now() + self.guard_window);
        }
    }

    /// Arm, or re-arm, the quiet window.
    pub fn kick_quiet(&mut self, owner: &K) {
        if self.owns(owner) {
            self.quiet = Some(Instant::now() + self.quiet_window);
        }
    }

    /// Disarm a single window, keeping the owner.
    pub fn disarm(&mut self, expiry: Expiry) {
        match expiry {
            Expiry::Guard => self.guard = None,
            Expiry::Quiet => self.quiet = None,
        }
    }

    /// Disarm both windows and release the owner.
    pub fn clear(&mut self) {
        self.owner = None;
        self.guard = None;
        self.quiet = None;
    }

    #[must_use]
    pub fn owner(&self) -> Option<&K> {
        self.owner.as_ref()
    }

    #[must_use]
    pub fn is_armed(&self, expiry: Expiry) -> bool {
        match expiry {
            Expiry::Guard => self.guard.is_some(),
            Expiry::Quiet => self.quiet.is_some(),
        }
    }

    /// The earliest armed deadline. On a tie, the quiet window wins.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Deadline<K>> {
        let owner = self.owner.clone()?;
        let (expiry, at) = match (self.guard, self.quiet) {
            (None, None) => return None,
            (Some(guard), None) => (Expiry::Guard, guard),
            (None, Some(quiet)) => (Expiry::Quiet, quiet),
            (Some(guard), Some(quiet)) if guard < quiet => (Expiry::Guard, guard),
            (Some(_), Some(quiet)) => (Expiry::Quiet, quiet),
        };

        Some(Deadline { owner, expiry, at })
    }

    /// Wait for `deadline` to pass. Never resolves if there is none.
    pub async fn wait(deadline: Option<Deadline<K>>) -> Deadline<K> {
        match deadline {
            Some(deadline) => {
                sleep_until(deadline.at).await;
                deadline
            }
            None => std::future::pending().await,
        }
    }

    fn owns(&self, owner: &K) -> bool {
        self.owner.as_ref() == Some(owner)
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
