//! Status broadcaster.
//!
//! Holds the latest immutable status snapshot and pushes it to every
//! subscriber when it changes. Publishing is non-blocking: a slow observer
//! loses updates, never stalls motion control.

use std::sync::Mutex;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::warn;
use serde::Serialize;

use crate::device::channel::ConnectionStatus;
use crate::engine::RunState;

/// Per-subscriber buffer depth before updates are dropped.
const SUBSCRIBER_BUFFER: usize = 64;

/// Progress of the pattern currently executing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    /// Completed fraction of planned commands, 0.0 to 1.0.
    pub percent: f64,
    /// Wall-clock seconds since run start, paused intervals excluded.
    pub elapsed_secs: f64,
    /// Estimated seconds left; `None` until one command has completed.
    pub remaining_secs: Option<f64>,
}

/// Playlist position, present while a playlist is being scheduled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistStatus {
    /// Playlist name.
    pub name: String,
    /// 0-based index of the current entry in the materialized order.
    pub index: usize,
    /// Number of entries in the materialized order.
    pub total: usize,
    /// Next entry to run, if any.
    pub next: Option<String>,
}

/// Immutable status snapshot delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// Engine run state.
    pub state: RunState,
    /// Serial connection state.
    pub connection: ConnectionStatus,
    /// Pattern currently executing, if any.
    pub pattern: Option<String>,
    /// Progress of the current pattern, if any.
    pub progress: Option<ProgressReport>,
    /// Current speed scalar.
    pub speed: f64,
    /// Playlist position, if a playlist is being scheduled.
    pub playlist: Option<PlaylistStatus>,
}

impl StatusSnapshot {
    /// Snapshot of a freshly constructed, disconnected, idle engine.
    pub fn initial(speed: f64) -> Self {
        Self {
            state: RunState::Idle,
            connection: ConnectionStatus {
                connected: false,
                port: None,
            },
            pattern: None,
            progress: None,
            speed,
            playlist: None,
        }
    }
}

struct SubscriberSlot {
    id: u64,
    tx: Sender<StatusSnapshot>,
}

struct Inner {
    current: StatusSnapshot,
    subscribers: Vec<SubscriberSlot>,
    next_id: u64,
}

/// Latest-snapshot holder with per-subscriber buffered fan-out.
pub struct StatusBroadcaster {
    inner: Mutex<Inner>,
}

impl StatusBroadcaster {
    /// Create a broadcaster holding the given initial snapshot.
    pub fn new(initial: StatusSnapshot) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: initial,
                subscribers: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// The latest snapshot.
    pub fn current(&self) -> StatusSnapshot {
        self.lock().current.clone()
    }

    /// Subscribe to status updates.
    ///
    /// The subscription immediately receives the current snapshot, then
    /// every subsequent change. There is no history replay. Dropping the
    /// subscription unsubscribes.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = bounded(SUBSCRIBER_BUFFER);
        let mut inner = self.lock();
        // A fresh channel always has room for the current snapshot.
        let _ = tx.send(inner.current.clone());
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push(SubscriberSlot { id, tx });
        Subscription { rx }
    }

    /// Publish a snapshot if it differs from the held one.
    ///
    /// Never blocks: a subscriber whose buffer is full loses this update
    /// (logged locally); a disconnected subscriber is pruned.
    pub fn publish(&self, snapshot: StatusSnapshot) {
        let mut inner = self.lock();
        if snapshot == inner.current {
            return;
        }
        inner.current = snapshot.clone();
        inner.subscribers.retain(|slot| {
            match slot.tx.try_send(snapshot.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!("status subscriber {} is slow, dropping update", slot.id);
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            }
        });
    }

    /// Number of live subscribers (stale ones are pruned on publish).
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("status broadcaster lock poisoned")
    }
}

/// A live status subscription.
pub struct Subscription {
    rx: Receiver<StatusSnapshot>,
}

impl Subscription {
    /// Wait for the next snapshot; `None` when the broadcaster is gone.
    pub fn recv(&self) -> Option<StatusSnapshot> {
        self.rx.recv().ok()
    }

    /// Wait up to `timeout` for the next snapshot.
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<StatusSnapshot> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Take a snapshot if one is buffered.
    pub fn try_recv(&self) -> Option<StatusSnapshot> {
        self.rx.try_recv().ok()
    }
}
