// WebSocket push channel: one background task per (game code, player id).
//
// The task connects, forwards text frames over an mpsc channel, sends the
// literal `ping` keepalive on a fixed interval, and on any loss of the
// socket waits a fixed delay and reconnects, forever, until `close()` is
// called. Subscribers observe connectivity through a watch channel and
// frames through the event receiver; no error from the socket ever reaches
// the caller directly.
//
// The frame-driving loop is generic over the stream and sink types so it
// can be exercised against in-memory streams in tests.

use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::protocol::{KEEPALIVE_FRAME, KEEPALIVE_REPLY};

/// Fixed delay between a lost connection and the next attempt. No backoff;
/// the servers this client talks to are close and the traffic is tiny.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// How often the client-side keepalive frame is sent.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// What the connection task reports to its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The socket is up (sent on every successful connect, including
    /// reconnects).
    Connected,
    /// A raw text frame arrived. Keepalive replies are filtered out before
    /// this point.
    Frame(String),
    /// The socket went down; a reconnect attempt follows unless the
    /// connection was closed.
    Disconnected,
}

/// Handle to a running push-channel task.
pub struct Connection {
    connected_rx: watch::Receiver<bool>,
    shutdown_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl Connection {
    /// Spawn the connection task for `url` and return the handle plus the
    /// event stream. The task starts connecting immediately.
    pub fn open(url: String) -> (Self, mpsc::Receiver<ConnectionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (connected_tx, connected_rx) = watch::channel(false);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run(url, event_tx, connected_tx, shutdown_rx));

        (
            Self {
                connected_rx,
                shutdown_tx,
                task,
            },
            event_rx,
        )
    }

    /// Current connectivity.
    pub fn is_connected(&self) -> bool {
        *self.connected_rx.borrow()
    }

    /// A watch receiver that flips with connectivity. Useful for UIs that
    /// only care about up/down, not frames.
    pub fn connectivity(&self) -> watch::Receiver<bool> {
        self.connected_rx.clone()
    }

    /// Stop the task: cancels any pending reconnect, sends a close frame
    /// if a socket is up, and ends the event stream.
    pub async fn close(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

/// Why a drive loop ended.
#[derive(Debug, PartialEq, Eq)]
enum DriveOutcome {
    /// `close()` was called or the event receiver was dropped.
    Shutdown,
    /// The socket closed, errored, or ended. Reconnect.
    ConnectionLost,
}

async fn run(
    url: String,
    event_tx: mpsc::Sender<ConnectionEvent>,
    connected_tx: watch::Sender<bool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            return;
        }

        match connect_async(url.as_str()).await {
            Ok((ws, _response)) => {
                info!(%url, "push channel connected");
                let _ = connected_tx.send(true);
                if event_tx.send(ConnectionEvent::Connected).await.is_err() {
                    return;
                }

                let (write, read) = ws.split();
                let outcome = drive(read, write, &event_tx, &mut shutdown_rx).await;

                let _ = connected_tx.send(false);
                if outcome == DriveOutcome::Shutdown {
                    return;
                }
                if event_tx.send(ConnectionEvent::Disconnected).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!(%url, error = %e, "push channel connect failed");
            }
        }

        // Fixed delay, interruptible by close().
        tokio::select! {
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            changed = shutdown_rx.changed() => {
                // A dropped handle counts as shutdown.
                if changed.is_err() || *shutdown_rx.borrow() {
                    return;
                }
            }
        }
    }
}

/// Pump one live socket: forward inbound text frames, send keepalives,
/// react to shutdown. Returns when the socket dies or shutdown is
/// requested.
async fn drive<R, W, E>(
    mut read: R,
    mut write: W,
    event_tx: &mpsc::Sender<ConnectionEvent>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> DriveOutcome
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    W: Sink<Message> + Unpin,
    E: std::fmt::Display,
{
    // First keepalive fires one full interval after connect.
    let mut keepalive = tokio::time::interval_at(
        tokio::time::Instant::now() + KEEPALIVE_INTERVAL,
        KEEPALIVE_INTERVAL,
    );
    keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    let _ = write.send(Message::Close(None)).await;
                    return DriveOutcome::Shutdown;
                }
            }
            _ = keepalive.tick() => {
                if write.send(Message::text(KEEPALIVE_FRAME)).await.is_err() {
                    return DriveOutcome::ConnectionLost;
                }
            }
            item = read.next() => match item {
                Some(Ok(Message::Text(text))) => {
                    if text.as_str() == KEEPALIVE_REPLY {
                        debug!("keepalive reply");
                        continue;
                    }
                    if event_tx
                        .send(ConnectionEvent::Frame(text.as_str().to_string()))
                        .await
                        .is_err()
                    {
                        return DriveOutcome::Shutdown;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "server closed the push channel");
                    return DriveOutcome::ConnectionLost;
                }
                // Control and binary frames carry nothing for us.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "push channel read error");
                    return DriveOutcome::ConnectionLost;
                }
                None => {
                    debug!("push channel stream ended");
                    return DriveOutcome::ConnectionLost;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn channels() -> (
        mpsc::Sender<ConnectionEvent>,
        mpsc::Receiver<ConnectionEvent>,
        watch::Sender<bool>,
        watch::Receiver<bool>,
    ) {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        (event_tx, event_rx, shutdown_tx, shutdown_rx)
    }

    #[tokio::test(start_paused = true)]
    async fn forwards_text_frames_in_order_and_swallows_pong() {
        let (event_tx, mut event_rx, _shutdown_tx, mut shutdown_rx) = channels();
        let read = stream::iter(vec![
            Ok::<_, std::io::Error>(Message::text("frame-1")),
            Ok(Message::text("pong")),
            Ok(Message::text("frame-2")),
        ]);
        let (write, _sink_rx) = futures_channel::mpsc::unbounded::<Message>();

        let outcome = drive(read, write, &event_tx, &mut shutdown_rx).await;
        assert_eq!(outcome, DriveOutcome::ConnectionLost);

        assert_eq!(
            event_rx.recv().await,
            Some(ConnectionEvent::Frame("frame-1".into()))
        );
        assert_eq!(
            event_rx.recv().await,
            Some(ConnectionEvent::Frame("frame-2".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn close_frame_ends_the_session() {
        let (event_tx, mut event_rx, _shutdown_tx, mut shutdown_rx) = channels();
        let read = stream::iter(vec![
            Ok::<_, std::io::Error>(Message::text("frame-1")),
            Ok(Message::Close(None)),
            Ok(Message::text("never-delivered")),
        ]);
        let (write, _sink_rx) = futures_channel::mpsc::unbounded::<Message>();

        let outcome = drive(read, write, &event_tx, &mut shutdown_rx).await;
        assert_eq!(outcome, DriveOutcome::ConnectionLost);

        assert_eq!(
            event_rx.recv().await,
            Some(ConnectionEvent::Frame("frame-1".into()))
        );
        drop(event_tx);
        assert_eq!(event_rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn read_error_ends_the_session() {
        let (event_tx, _event_rx, _shutdown_tx, mut shutdown_rx) = channels();
        let read = stream::iter(vec![Err::<Message, _>(std::io::Error::other("boom"))]);
        let (write, _sink_rx) = futures_channel::mpsc::unbounded::<Message>();

        let outcome = drive(read, write, &event_tx, &mut shutdown_rx).await;
        assert_eq!(outcome, DriveOutcome::ConnectionLost);
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_pings_on_the_fixed_interval() {
        let (event_tx, _event_rx, _shutdown_tx, mut shutdown_rx) = channels();
        let read = stream::pending::<Result<Message, std::io::Error>>();
        let (write, mut sink_rx) = futures_channel::mpsc::unbounded::<Message>();

        let handle =
            tokio::spawn(async move { drive(read, write, &event_tx, &mut shutdown_rx).await });

        // Paused time auto-advances while every task is idle, so the first
        // two ticks fire as soon as we await the sink.
        let first = sink_rx.next().await.unwrap();
        assert_eq!(first, Message::text(KEEPALIVE_FRAME));
        let second = sink_rx.next().await.unwrap();
        assert_eq!(second, Message::text(KEEPALIVE_FRAME));

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_sends_close_and_returns() {
        let (event_tx, _event_rx, shutdown_tx, mut shutdown_rx) = channels();
        let read = stream::pending::<Result<Message, std::io::Error>>();
        let (write, mut sink_rx) = futures_channel::mpsc::unbounded::<Message>();

        let handle =
            tokio::spawn(async move { drive(read, write, &event_tx, &mut shutdown_rx).await });

        shutdown_tx.send(true).unwrap();
        assert_eq!(handle.await.unwrap(), DriveOutcome::Shutdown);
        assert_eq!(sink_rx.next().await, Some(Message::Close(None)));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_event_receiver_stops_the_loop() {
        let (event_tx, event_rx, _shutdown_tx, mut shutdown_rx) = channels();
        drop(event_rx);
        let read = stream::iter(vec![Ok::<_, std::io::Error>(Message::text("frame"))]);
        let (write, _sink_rx) = futures_channel::mpsc::unbounded::<Message>();

        let outcome = drive(read, write, &event_tx, &mut shutdown_rx).await;
        assert_eq!(outcome, DriveOutcome::Shutdown);
    }
}
