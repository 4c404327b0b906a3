//! Signal channel between an animation process and its supervisor.
//!
//! The animation writes markers to stdout, one per line:
//!
//! | Line | Meaning |
//! |---|---|
//! | `COVERED` (or `READY`) | the overlay fully hides the desktop |
//! | `FINISHED` (or `BLACK`) | the exit animation is done, the process may be reaped |
//!
//! Anything else is inert. [`pump_lines`] parses the stream and forwards each
//! marker at most once and in protocol order, then reports [`SignalEvent::Exited`]
//! when the stream closes. The channel is bounded to [`SIGNAL_CHANNEL_CAPACITY`],
//! which covers every event a handler can produce, so the writer never waits on
//! the reader.

use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Covered, Finished and Exited.
pub const SIGNAL_CHANNEL_CAPACITY: usize = 3;

/// A milestone written by the animation process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Covered,
    Finished,
}

impl Marker {
    /// Parses one output line. Returns `None` for inert output.
    ///
    /// # Examples
    ///
    /// ```
    /// use power_manager::signal::Marker;
    ///
    /// assert_eq!(Marker::parse("COVERED\n"), Some(Marker::Covered));
    /// assert_eq!(Marker::parse("BLACK"), Some(Marker::Finished));
    /// assert_eq!(Marker::parse("frame 12"), None);
    /// ```
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "COVERED" | "READY" => Some(Self::Covered),
            "FINISHED" | "BLACK" => Some(Self::Finished),
            _ => None,
        }
    }
}

/// Everything the supervisor can learn from the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    Marker(Marker),
    /// The animation closed its output, normally because it exited.
    Exited,
}

/// Writing half. Enforces the at-most-once, covered-before-finished rule.
#[derive(Debug)]
pub struct SignalSender {
    tx: mpsc::Sender<SignalEvent>,
    covered: bool,
    finished: bool,
}

impl SignalSender {
    /// Forwards `marker` if the protocol allows it. Returns whether it was sent.
    pub fn send(&mut self, marker: Marker) -> bool {
        let accepted = match marker {
            Marker::Covered if !self.covered => {
                self.covered = true;
                true
            }
            Marker::Finished if self.covered && !self.finished => {
                self.finished = true;
                true
            }
            _ => false,
        };
        if !accepted {
            tracing::debug!(?marker, "ignoring out-of-order or repeated marker");
            return false;
        }
        self.tx.try_send(SignalEvent::Marker(marker)).is_ok()
    }

    /// Reports that no more markers will arrive.
    pub fn close(self) {
        let _ = self.tx.try_send(SignalEvent::Exited);
    }
}

/// Reading half.
#[derive(Debug)]
pub struct SignalReceiver {
    rx: mpsc::Receiver<SignalEvent>,
}

/// Result of waiting on the channel with a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    Event(SignalEvent),
    TimedOut,
}

impl SignalReceiver {
    /// Waits for the next event until `deadline`.
    ///
    /// A dropped sender counts as [`SignalEvent::Exited`].
    pub async fn recv_until(&mut self, deadline: Instant) -> Received {
        match tokio::time::timeout_at(deadline, self.rx.recv()).await {
            Ok(Some(event)) => Received::Event(event),
            Ok(None) => Received::Event(SignalEvent::Exited),
            Err(_) => Received::TimedOut,
        }
    }

    /// Waits for the next event for at most `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Received {
        self.recv_until(Instant::now() + timeout).await
    }
}

/// Creates a bounded signal channel.
#[must_use]
pub fn channel() -> (SignalSender, SignalReceiver) {
    let (tx, rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);
    (
        SignalSender {
            tx,
            covered: false,
            finished: false,
        },
        SignalReceiver { rx },
    )
}

/// Longest line read in one piece; longer output is split and stays inert.
const MAX_LINE_BYTES: u64 = 4096;

/// Reads `reader` line by line, forwarding markers until end of stream.
///
/// Lines are decoded lossily, so binary or non-UTF-8 output is inert like any
/// other text. Only end of stream or a read error closes the channel.
pub async fn pump_lines<R>(mut reader: R, mut sender: SignalSender)
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(128);
    loop {
        buf.clear();
        match (&mut reader)
            .take(MAX_LINE_BYTES)
            .read_until(b'\n', &mut buf)
            .await
        {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                tracing::debug!(line = %line.trim(), "animation output");
                if let Some(marker) = Marker::parse(&line) {
                    sender.send(marker);
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "error reading animation output");
                break;
            }
        }
    }
    sender.close();
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(input: &[u8]) -> Vec<SignalEvent> {
        let (tx, mut rx) = channel();
        pump_lines(input, tx).await;
        let mut events = Vec::new();
        while let Received::Event(event) = rx.recv_timeout(Duration::from_millis(10)).await {
            events.push(event);
            if event == SignalEvent::Exited {
                break;
            }
        }
        events
    }

    #[tokio::test]
    async fn forwards_markers_in_order_then_exit() {
        let events = drain(b"loading\nCOVERED\nframe\nFINISHED\n").await;
        assert_eq!(
            events,
            vec![
                SignalEvent::Marker(Marker::Covered),
                SignalEvent::Marker(Marker::Finished),
                SignalEvent::Exited,
            ]
        );
    }

    #[tokio::test]
    async fn repeated_and_early_markers_are_inert() {
        let events = drain(b"FINISHED\nREADY\nCOVERED\n  BLACK  \nBLACK\n").await;
        assert_eq!(
            events,
            vec![
                SignalEvent::Marker(Marker::Covered),
                SignalEvent::Marker(Marker::Finished),
                SignalEvent::Exited,
            ]
        );
    }

    #[tokio::test]
    async fn undecodable_output_does_not_close_the_channel() {
        let events = drain(b"\xff\xfe\nCOVERED\n").await;
        assert_eq!(
            events,
            vec![SignalEvent::Marker(Marker::Covered), SignalEvent::Exited]
        );
    }

    #[tokio::test]
    async fn overlong_lines_are_split_and_inert() {
        let mut input = vec![b'x'; 3 * MAX_LINE_BYTES as usize];
        input.extend_from_slice(b"\nCOVERED\n");
        let events = drain(&input).await;
        assert_eq!(
            events,
            vec![SignalEvent::Marker(Marker::Covered), SignalEvent::Exited]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn silent_channel_times_out() {
        let (_tx, mut rx) = channel();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).await, Received::TimedOut);
    }

    #[tokio::test]
    async fn dropped_sender_reads_as_exit() {
        let (tx, mut rx) = channel();
        drop(tx);
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).await,
            Received::Event(SignalEvent::Exited)
        );
    }
}
