//! Snapshot of the last committed sync and its on-disk store

use selfsync_types::{Error, Millis, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// The vault state as of the last successfully committed transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Every file path present at commit time
    pub known_paths: BTreeSet<String>,
    /// Commit time in epoch seconds
    pub last_sync_timestamp: f64,
}

impl Snapshot {
    /// The snapshot of a vault that has never synced
    pub fn fresh() -> Self {
        Self::default()
    }

    /// Create a snapshot from a listing and a commit time
    pub fn new<I, S>(known_paths: I, last_sync_timestamp: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_paths: known_paths.into_iter().map(Into::into).collect(),
            last_sync_timestamp,
        }
    }

    /// Modification times above this count as changes since the last sync
    pub fn recency_threshold_millis(&self) -> Millis {
        (self.last_sync_timestamp * 1000.0).round() as Millis
    }

    /// Check whether this vault has never committed a sync
    pub fn is_fresh(&self) -> bool {
        self.known_paths.is_empty() && self.last_sync_timestamp == 0.0
    }
}

/// JSON persistence for [`Snapshot`]
///
/// A store without a path keeps nothing on disk; loading it always yields the
/// fresh snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    path: Option<PathBuf>,
}

impl SnapshotStore {
    /// Create a store backed by the given file
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Create a store that never touches disk
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    /// Get the backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load the persisted snapshot; a missing file is a fresh vault
    pub async fn load(&self) -> Result<Snapshot> {
        let Some(path) = &self.path else {
            return Ok(Snapshot::fresh());
        };

        if !fs::try_exists(path).await.unwrap_or(false) {
            debug!("Snapshot file does not exist, starting fresh");
            return Ok(Snapshot::fresh());
        }

        let data = fs::read(path).await.map_err(|e| {
            Error::snapshot(format!(
                "Failed to read snapshot '{}': {}",
                path.display(),
                e
            ))
        })?;

        let snapshot: Snapshot = serde_json::from_slice(&data).map_err(|e| {
            Error::snapshot(format!(
                "Failed to parse snapshot '{}': {}",
                path.display(),
                e
            ))
        })?;

        info!(
            "Loaded snapshot with {} known paths",
            snapshot.known_paths.len()
        );
        Ok(snapshot)
    }

    /// Persist a snapshot, replacing the previous file atomically
    pub async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::snapshot(format!(
                    "Failed to create state directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let data = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| Error::snapshot(format!("Failed to serialize snapshot: {}", e)))?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, data).await.map_err(|e| {
            Error::snapshot(format!(
                "Failed to write snapshot '{}': {}",
                temp_path.display(),
                e
            ))
        })?;
        fs::rename(&temp_path, path).await.map_err(|e| {
            Error::snapshot(format!(
                "Failed to replace snapshot '{}': {}",
                path.display(),
                e
            ))
        })?;

        debug!("Persisted snapshot to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_snapshot() {
        let snapshot = Snapshot::fresh();
        assert!(snapshot.is_fresh());
        assert_eq!(snapshot.recency_threshold_millis(), 0);
    }

    #[test]
    fn test_recency_threshold() {
        let snapshot = Snapshot::new(["a.md"], 1_700_000_000.5);
        assert_eq!(snapshot.recency_threshold_millis(), 1_700_000_000_500);
        assert!(!snapshot.is_fresh());
    }

    #[tokio::test]
    async fn test_missing_file_loads_fresh() {
        let temp_dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp_dir.path().join(".selfsync/snapshot.json"));
        assert_eq!(store.load().await.unwrap(), Snapshot::fresh());
    }

    #[tokio::test]
    async fn test_persist_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".selfsync/snapshot.json");
        let store = SnapshotStore::new(&path);

        let snapshot = Snapshot::new(["a.md", "img/b.png"], 1_712_345_678.25);
        store.persist(&snapshot).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(store.load().await.unwrap(), snapshot);

        // Replaced wholesale
        let next = Snapshot::new(["c.pdf"], 1_712_345_700.0);
        store.persist(&next).await.unwrap();
        assert_eq!(store.load().await.unwrap(), next);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_snapshot_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("snapshot.json");
        std::fs::write(&path, b"not json").unwrap();

        let err = SnapshotStore::new(&path).load().await.unwrap_err();
        assert_eq!(err.kind(), selfsync_types::ErrorKind::Snapshot);
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = SnapshotStore::in_memory();
        store.persist(&Snapshot::new(["a.md"], 1.0)).await.unwrap();
        assert!(store.load().await.unwrap().is_fresh());
        assert!(store.path().is_none());
    }
}
