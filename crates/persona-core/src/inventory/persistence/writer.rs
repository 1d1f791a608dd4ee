use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{SnapshotSink, SnapshotStore, StoreError};
use crate::inventory::domain::SessionId;
use crate::inventory::session::SessionSnapshot;

/// Counts reported when the writer drains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterSummary {
    pub written: usize,
    /// Progress snapshots that arrived after their session's final snapshot.
    pub dropped: usize,
    pub failed: usize,
}

/// Non-blocking sink that forwards snapshots to a store on a blocking task.
///
/// Snapshots are written in the order offered. Once a session's final
/// snapshot is written, later snapshots for that session are discarded.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    sender: mpsc::UnboundedSender<SessionSnapshot>,
}

pub struct WriterHandle {
    handle: JoinHandle<WriterSummary>,
}

impl SnapshotWriter {
    /// Start the worker. Must be called inside a tokio runtime.
    pub fn spawn<S>(store: Arc<S>) -> (Self, WriterHandle)
    where
        S: SnapshotStore + ?Sized + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::task::spawn_blocking(move || drain(store.as_ref(), receiver));
        (Self { sender }, WriterHandle { handle })
    }
}

impl SnapshotSink for SnapshotWriter {
    fn offer(&self, snapshot: SessionSnapshot) -> Result<(), StoreError> {
        self.sender.send(snapshot).map_err(|_| StoreError::Closed)
    }
}

impl WriterHandle {
    /// Wait for every queued snapshot to be written. Resolves once all
    /// [`SnapshotWriter`] clones are dropped.
    pub async fn join(self) -> Result<WriterSummary, StoreError> {
        self.handle
            .await
            .map_err(|err| StoreError::Worker(err.to_string()))
    }
}

fn drain<S>(store: &S, mut receiver: mpsc::UnboundedReceiver<SessionSnapshot>) -> WriterSummary
where
    S: SnapshotStore + ?Sized,
{
    // One id per session finalized through this writer, held until it drains.
    // A writer lives as long as one CLI invocation, which runs one session.
    let mut finalized: HashSet<SessionId> = HashSet::new();
    let mut summary = WriterSummary::default();

    while let Some(snapshot) = receiver.blocking_recv() {
        if finalized.contains(&snapshot.session_id) {
            debug!(session_id = %snapshot.session_id, "snapshot after finalization dropped");
            summary.dropped += 1;
            continue;
        }

        match store.save(&snapshot) {
            Ok(()) => {
                summary.written += 1;
                if snapshot.is_final() {
                    finalized.insert(snapshot.session_id.clone());
                }
            }
            Err(err) => {
                warn!(session_id = %snapshot.session_id, error = %err, "snapshot write failed");
                summary.failed += 1;
            }
        }
    }

    summary
}
