//! Push channel carrying snapshots from a store to one watcher

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use super::document::Snapshot;

/// Lazy, non-restartable sequence of snapshots for one watch
///
/// Closing or dropping the stream is the cancellation: the store sees the
/// channel closed and stops delivering to it.
#[derive(Debug)]
pub struct SnapshotStream {
    rx: mpsc::UnboundedReceiver<Snapshot>,
}

impl SnapshotStream {
    /// Create a connected sender/stream pair
    ///
    /// Store implementations keep the sender and push one snapshot per change.
    pub fn channel() -> (mpsc::UnboundedSender<Snapshot>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Wait for the next snapshot; `None` once the store side has gone away
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    /// Stop receiving further snapshots
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Stream for SnapshotStream {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
