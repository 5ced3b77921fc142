// Orchestration: the single consumer of connection events.
//
// One loop owns the snapshot. Frames come in from the connection task,
// get decoded and reduced, and the resulting updates go out to whoever is
// presenting them (the binary just logs). Decode failures and unknown
// message types are logged and dropped; the loop itself only ends when the
// connection event stream does.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connection::ConnectionEvent;
use crate::game::reducer;
use crate::game::state::GameSnapshot;
use crate::protocol::{DecodeError, Notification, ServerMessage};

/// What the sync loop publishes to its subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Push channel went up or down.
    Connectivity(bool),
    /// The snapshot changed (replaced or patched). Carries the new value.
    Snapshot(Box<GameSnapshot>),
    /// The local player's money moved between consecutive authoritative
    /// snapshots. Derived, transient; the new balance is on the snapshot.
    MoneyChanged { delta: i64 },
    /// A transient gameplay event for UI feedback.
    Notice(Notification),
}

/// The snapshot plus the frame-handling logic, separated from the loop so
/// tests can drive it frame by frame.
pub struct SyncState {
    snapshot: Option<GameSnapshot>,
}

impl SyncState {
    pub fn new(initial: Option<GameSnapshot>) -> Self {
        Self { snapshot: initial }
    }

    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        self.snapshot.as_ref()
    }

    /// Decode one raw frame and apply it, returning the updates to publish.
    pub fn handle_frame(&mut self, frame: &str) -> Vec<SyncEvent> {
        let message = match ServerMessage::decode(frame) {
            Ok(message) => message,
            Err(DecodeError::UnknownType(kind)) => {
                debug!(%kind, "ignoring unknown message type");
                return Vec::new();
            }
            Err(DecodeError::Malformed(e)) => {
                warn!(error = %e, "dropping malformed frame");
                return Vec::new();
            }
        };

        if let ServerMessage::Notification(notification) = message {
            return vec![SyncEvent::Notice(notification)];
        }

        let mut events = Vec::new();
        if let ServerMessage::GameState(incoming) = &message {
            if let Some(previous) = &self.snapshot {
                let delta = incoming.your_money - previous.your_money;
                if delta != 0 {
                    info!(delta, balance = incoming.your_money, "money changed");
                    events.push(SyncEvent::MoneyChanged { delta });
                }
            }
        }

        let before = self.snapshot.take();
        self.snapshot = reducer::apply(before, &message);
        if let Some(snapshot) = &self.snapshot {
            events.push(SyncEvent::Snapshot(Box::new(snapshot.clone())));
        }
        events
    }
}

/// Pump connection events into sync events until either channel closes.
pub async fn run(
    mut connection_events: mpsc::Receiver<ConnectionEvent>,
    updates: mpsc::Sender<SyncEvent>,
    initial: Option<GameSnapshot>,
) {
    let mut state = SyncState::new(initial);

    while let Some(event) = connection_events.recv().await {
        let outgoing = match event {
            ConnectionEvent::Connected => vec![SyncEvent::Connectivity(true)],
            ConnectionEvent::Disconnected => vec![SyncEvent::Connectivity(false)],
            ConnectionEvent::Frame(frame) => state.handle_frame(&frame),
        };
        for update in outgoing {
            if updates.send(update).await.is_err() {
                debug!("sync subscriber gone, stopping");
                return;
            }
        }
    }
    info!("connection event stream ended");
}
