//! Absolute deadlines for stream operations.
//!
//! The engine has no notion of socket deadlines, so each direction of a
//! stream keeps one of these and polls it whenever it has to wait.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::time::{sleep_until, Instant, Sleep};

/// An optional point in time after which waiting operations fail.
#[derive(Debug, Default)]
pub(crate) struct Deadline {
    at: Option<Instant>,
    timer: Option<Pin<Box<Sleep>>>,
}

impl Deadline {
    /// Replace the deadline. `None` disables it. The timer is armed on the
    /// first poll, so this does not need a runtime.
    pub(crate) fn set(&mut self, at: Option<Instant>) {
        self.at = at;
        self.timer = None;
    }

    pub(crate) fn get(&self) -> Option<Instant> {
        self.at
    }

    /// Ready once the deadline has passed. Registers the task for wakeup
    /// otherwise.
    pub(crate) fn poll_elapsed(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        let Some(at) = self.at else {
            return Poll::Pending;
        };
        if Instant::now() >= at {
            return Poll::Ready(());
        }
        self.timer
            .get_or_insert_with(|| Box::pin(sleep_until(at)))
            .as_mut()
            .poll(cx)
    }
}
