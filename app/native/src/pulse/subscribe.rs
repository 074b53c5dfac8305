//! [`EventSource`] backed by `pactl subscribe`.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

use super::command::Tool;
use super::controller::application_of;
use super::parse;
use crate::config::PulseConfig;
use crate::error::SwitcherError;
use crate::switcher::{EventSource, ServerEvent};

const CHANNEL_CAPACITY: usize = 64;

/// Streams stream lifecycle events from `pactl subscribe`.
#[derive(Debug, Clone)]
pub struct PactlEventSource {
    pactl: Tool,
}

impl PactlEventSource {
    /// Locates `pactl`.
    ///
    /// # Errors
    ///
    /// Returns [`SwitcherError::Command`] if `pactl` cannot be found.
    pub fn new(config: &PulseConfig) -> Result<Self, SwitcherError> {
        Ok(Self { pactl: Tool::locate(&config.pactl)? })
    }
}

impl EventSource for PactlEventSource {
    async fn subscribe(&mut self) -> Result<mpsc::Receiver<ServerEvent>, SwitcherError> {
        // `pactl info` fails until the server accepts connections.
        if let Err(err) = self.pactl.run_async(&["info"]).await {
            return Err(SwitcherError::Unavailable(err.to_string()));
        }

        let mut child = self
            .pactl
            .async_command()
            .arg("subscribe")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SwitcherError::Io("pactl subscribe has no stdout".to_string()))?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(forward(child, stdout, tx, self.pactl.clone()));
        tracing::debug!("subscribed to PulseAudio events");
        Ok(rx)
    }
}

/// Forwards parsed events until the subprocess output ends or the receiver
/// is dropped. Closing `tx` signals the end of the feed.
async fn forward(
    mut child: Child,
    stdout: impl AsyncRead + Unpin,
    tx: mpsc::Sender<ServerEvent>,
    pactl: Tool,
) {
    let mut lines = BufReader::new(stdout).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::warn!("pactl subscribe exited");
                break;
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot read from pactl subscribe");
                break;
            }
        };

        let Some(event) = parse::feed_event(&line) else { continue };
        let event = match event {
            ServerEvent::New { kind, id, .. } => ServerEvent::New {
                kind,
                id,
                application: application_of(&pactl, kind, id).await,
            },
            removed @ ServerEvent::Remove { .. } => removed,
        };

        if tx.send(event).await.is_err() {
            break;
        }
    }

    if let Err(err) = child.kill().await {
        tracing::debug!(error = %err, "pactl subscribe already gone");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::switcher::StreamKind;

    #[tokio::test]
    async fn test_forward_parses_and_closes_at_eof() {
        // Stand-in child; the feed itself comes from `input`.
        let child = tokio::process::Command::new("sh")
            .args(["-c", "sleep 5"])
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let input: &[u8] = b"Event 'change' on sink #1\nEvent 'remove' on sink-input #12\nEvent 'new' on client #4\nEvent 'remove' on source-output #3\n";
        let (tx, mut rx) = mpsc::channel(8);

        forward(child, input, tx, Tool::locate("sh").unwrap()).await;

        assert_eq!(rx.recv().await, Some(ServerEvent::removed(StreamKind::Output, 12)));
        assert_eq!(rx.recv().await, Some(ServerEvent::removed(StreamKind::Input, 3)));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_forward_stops_when_receiver_is_dropped() {
        let child = tokio::process::Command::new("sh")
            .args(["-c", "sleep 5"])
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let input: &[u8] = b"Event 'remove' on sink-input #1\nEvent 'remove' on sink-input #2\n";
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        forward(child, input, tx, Tool::locate("sh").unwrap()).await;
    }
}
