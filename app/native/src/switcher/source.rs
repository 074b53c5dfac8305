//! Event feed subscription.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

use super::event::ServerEvent;
use crate::error::SwitcherError;

/// Produces the live sequence of stream lifecycle events.
///
/// A subscription is not restartable: once the returned channel closes, the
/// feed is gone for good.
pub trait EventSource {
    /// Opens the feed.
    ///
    /// Fails with [`SwitcherError::Unavailable`] while the audio server is
    /// not reachable yet.
    fn subscribe(
        &mut self,
    ) -> impl Future<Output = Result<mpsc::Receiver<ServerEvent>, SwitcherError>>;
}

/// Subscribes to `source`, retrying every `poll` while the server is
/// unavailable, for at most `window`.
///
/// # Errors
///
/// Returns the last [`SwitcherError::Unavailable`] once the window has
/// passed, or any other subscription error immediately.
pub async fn connect<S: EventSource>(
    source: &mut S,
    window: Duration,
    poll: Duration,
) -> Result<mpsc::Receiver<ServerEvent>, SwitcherError> {
    let deadline = Instant::now() + window;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match source.subscribe().await {
            Ok(events) => {
                tracing::debug!(attempts, "subscribed to event feed");
                return Ok(events);
            }
            Err(err) if err.is_transient() && Instant::now() < deadline => {
                tracing::debug!(attempts, error = %err, "audio server not ready, waiting");
                sleep(poll).await;
            }
            Err(err) => return Err(err),
        }
    }
}
