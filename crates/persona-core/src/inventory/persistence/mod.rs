//! Snapshot storage for resumable sessions.
//!
//! Stores are synchronous and keyed by session id. Anything that accepts
//! snapshots is a [`SnapshotSink`]; the [`SnapshotWriter`] sink moves store
//! writes onto a background task so presentation never waits on disk.

mod writer;

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::domain::SessionId;
use super::session::SessionSnapshot;

pub use writer::{SnapshotWriter, WriterHandle, WriterSummary};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot writer is closed")]
    Closed,
    #[error("snapshot writer failed: {0}")]
    Worker(String),
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),
    #[error("no saved session '{0}'")]
    NotFound(SessionId),
}

/// Storage abstraction so sessions can be persisted without the core caring where.
pub trait SnapshotStore: Send + Sync {
    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError>;
    fn load(&self, id: &SessionId) -> Result<Option<SessionSnapshot>, StoreError>;
    fn list(&self) -> Result<Vec<SessionId>, StoreError>;
}

/// Receives snapshots after every change. Implementations must not block for long.
pub trait SnapshotSink: Send + Sync {
    fn offer(&self, snapshot: SessionSnapshot) -> Result<(), StoreError>;
}

impl<S: SnapshotSink + ?Sized> SnapshotSink for Arc<S> {
    fn offer(&self, snapshot: SessionSnapshot) -> Result<(), StoreError> {
        (**self).offer(snapshot)
    }
}

/// One entry in the memory store's write log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRecord {
    pub session_id: SessionId,
    pub presented: usize,
    pub is_final: bool,
}

#[derive(Debug, Default, Clone)]
pub struct MemorySnapshotStore {
    snapshots: Arc<Mutex<HashMap<SessionId, SessionSnapshot>>>,
    log: Arc<Mutex<Vec<SaveRecord>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every save in the order it happened.
    pub fn history(&self) -> Vec<SaveRecord> {
        self.log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("snapshot store lock poisoned".to_string())
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let mut snapshots = self.snapshots.lock().map_err(poisoned)?;
        let mut log = self.log.lock().map_err(poisoned)?;
        snapshots.insert(snapshot.session_id.clone(), snapshot.clone());
        log.push(SaveRecord {
            session_id: snapshot.session_id.clone(),
            presented: snapshot.ledger.len(),
            is_final: snapshot.is_final(),
        });
        Ok(())
    }

    fn load(&self, id: &SessionId) -> Result<Option<SessionSnapshot>, StoreError> {
        let snapshots = self.snapshots.lock().map_err(poisoned)?;
        Ok(snapshots.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<SessionId>, StoreError> {
        let snapshots = self.snapshots.lock().map_err(poisoned)?;
        let mut ids: Vec<_> = snapshots.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }
}

impl SnapshotSink for MemorySnapshotStore {
    fn offer(&self, snapshot: SessionSnapshot) -> Result<(), StoreError> {
        self.save(&snapshot)
    }
}

/// One pretty-printed JSON file per session under `root`.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    root: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: &SessionId) -> PathBuf {
        self.root.join(format!("{}.json", id.as_str()))
    }
}

impl SnapshotStore for JsonFileSnapshotStore {
    /// Written to a sibling temp file and renamed, so readers only ever see
    /// a complete snapshot.
    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(&snapshot.session_id);
        let staging = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let mut file = fs::File::create(&staging)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&staging, &path)?;

        debug!(
            session_id = %snapshot.session_id,
            path = %path.display(),
            presented = snapshot.ledger.len(),
            "snapshot saved"
        );
        Ok(())
    }

    fn load(&self, id: &SessionId) -> Result<Option<SessionSnapshot>, StoreError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn list(&self) -> Result<Vec<SessionId>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(SessionId::new(stem));
            }
        }
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }
}

impl SnapshotSink for JsonFileSnapshotStore {
    fn offer(&self, snapshot: SessionSnapshot) -> Result<(), StoreError> {
        self.save(&snapshot)
    }
}
