// Snapshot handoff from the scheduler to the presentation sink.
//
// Single slot, latest value wins: publishing never blocks, a slow reader
// skips snapshots but always sees them in cycle order.

use crate::models::Snapshot;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was requested (or the scheduler handle was dropped).
    Requested,
    /// The scheduler loop itself failed; no further snapshots will arrive.
    TimerFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Feed {
    /// No cycle has completed yet.
    Pending,
    Snapshot(Arc<Snapshot>),
    /// Terminal; always the last value published.
    Stopped(StopReason),
}

pub fn channel() -> (FeedPublisher, FeedReceiver) {
    let (tx, rx) = watch::channel(Feed::Pending);
    (FeedPublisher { tx }, FeedReceiver { rx })
}

#[derive(Clone)]
pub struct FeedPublisher {
    tx: watch::Sender<Feed>,
}

impl FeedPublisher {
    /// Replaces the slot contents. Succeeds with or without receivers.
    pub fn publish(&self, snapshot: Snapshot) {
        self.tx.send_replace(Feed::Snapshot(Arc::new(snapshot)));
    }

    pub fn stop(&self, reason: StopReason) {
        self.tx.send_replace(Feed::Stopped(reason));
    }

    pub fn subscribe(&self) -> FeedReceiver {
        FeedReceiver {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Clone)]
pub struct FeedReceiver {
    rx: watch::Receiver<Feed>,
}

impl FeedReceiver {
    /// Waits for a value newer than the last one returned. `None` once the
    /// publisher is gone and every value has been seen.
    pub async fn recv(&mut self) -> Option<Feed> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Current slot contents without waiting.
    pub fn latest(&self) -> Feed {
        self.rx.borrow().clone()
    }
}
