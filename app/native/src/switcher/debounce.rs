//! Quiet-period timer.
//!
//! Every accepted event re-arms the timer; [`Debouncer::settled`] completes
//! once the full interval has passed without another re-arm.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep, sleep};

/// Coalesces bursts of events into a single settle signal.
#[derive(Debug)]
pub struct Debouncer {
    interval: Duration,
    deadline: Option<Pin<Box<Sleep>>>,
}

impl Debouncer {
    /// Creates a disarmed debouncer.
    #[must_use]
    pub const fn new(interval: Duration) -> Self { Self { interval, deadline: None } }

    /// Returns whether a settle signal is pending.
    #[must_use]
    pub const fn is_armed(&self) -> bool { self.deadline.is_some() }

    /// Starts (or restarts) the quiet period from now.
    pub fn arm(&mut self) {
        let deadline = Instant::now() + self.interval;
        match self.deadline.as_mut() {
            Some(timer) => timer.as_mut().reset(deadline),
            None => self.deadline = Some(Box::pin(sleep(self.interval))),
        }
    }

    /// Cancels any pending settle signal.
    pub fn disarm(&mut self) { self.deadline = None; }

    /// Waits until the quiet period elapses, then disarms.
    ///
    /// Never completes while disarmed. Cancel safe: dropping the future
    /// keeps the pending deadline.
    pub async fn settled(&mut self) {
        match self.deadline.as_mut() {
            Some(timer) => {
                timer.as_mut().await;
                self.deadline = None;
            }
            None => std::future::pending().await,
        }
    }
}
