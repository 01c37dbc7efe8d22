//! Sync transaction coordinator

use crate::codec::{build_request, parse_response, strip_vault_prefix, SyncResponse};
use crate::delta::compute_change_set;
use crate::phase::{PhaseCell, SyncPhase};
use crate::reaper::reap;
use crate::snapshot::{Snapshot, SnapshotStore};
use futures::future::join_all;
use selfsync_types::{
    parent_dir, ContentKind, Error, ErrorKind, HostEvent, NoopStatus, Result, StatusReporter,
    SyncStatus, SyncTransport, VaultHost,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Result of a call to [`SyncCoordinator::trigger`]
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// The transaction ran and committed
    Completed(SyncReport),
    /// Another transaction was in flight; nothing was done
    Skipped {
        /// Phase of the transaction already running
        phase: SyncPhase,
    },
}

impl SyncOutcome {
    /// Get the report of a completed transaction
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped { .. } => None,
        }
    }
}

/// A local path the apply phase could not handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// Vault path
    pub path: String,
    /// Failure category
    pub kind: ErrorKind,
    /// Failure description
    pub reason: String,
}

/// Summary of one committed transaction
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Transaction ID for log correlation
    pub transaction_id: Uuid,
    /// Paths uploaded to the server
    pub uploaded: Vec<String>,
    /// Local deletions reported to the server
    pub reported_deletions: Vec<String>,
    /// Paths written from the server's archive
    pub written: Vec<String>,
    /// Paths deleted at the server's request
    pub deleted: Vec<String>,
    /// Per-item apply failures
    pub skipped: Vec<SkippedItem>,
    /// Empty directories removed after applying
    pub directories_removed: usize,
    /// Number of paths in the committed snapshot
    pub known_paths: usize,
    /// Commit time in epoch seconds
    pub committed_at: f64,
    /// Wall-clock duration of the transaction
    pub duration: Duration,
}

impl SyncReport {
    fn new(transaction_id: Uuid) -> Self {
        Self {
            transaction_id,
            uploaded: Vec::new(),
            reported_deletions: Vec::new(),
            written: Vec::new(),
            deleted: Vec::new(),
            skipped: Vec::new(),
            directories_removed: 0,
            known_paths: 0,
            committed_at: 0.0,
            duration: Duration::default(),
        }
    }

    fn skip(&mut self, path: String, error: &Error) {
        warn!("Skipping '{}': {}", path, error);
        self.skipped.push(SkippedItem {
            path,
            kind: error.kind(),
            reason: error.to_string(),
        });
    }

    /// Check whether every item applied cleanly
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Drives sync transactions against a host and a transport
///
/// One transaction runs at a time. The snapshot changes only at commit.
pub struct SyncCoordinator {
    host: Arc<dyn VaultHost>,
    transport: Arc<dyn SyncTransport>,
    status: Arc<dyn StatusReporter>,
    store: SnapshotStore,
    snapshot: RwLock<Snapshot>,
    phase: PhaseCell,
    vault_name: String,
}

/// Returns the phase cell to `Idle` however the transaction ends
struct PhaseGuard<'a>(&'a PhaseCell);

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.0.reset();
    }
}

impl SyncCoordinator {
    /// Create a coordinator with a fresh, unpersisted snapshot
    pub fn new<S: Into<String>>(
        host: Arc<dyn VaultHost>,
        transport: Arc<dyn SyncTransport>,
        vault_name: S,
    ) -> Self {
        Self {
            host,
            transport,
            status: Arc::new(NoopStatus),
            store: SnapshotStore::in_memory(),
            snapshot: RwLock::new(Snapshot::fresh()),
            phase: PhaseCell::new(),
            vault_name: vault_name.into(),
        }
    }

    /// Set the status reporter
    pub fn with_status(mut self, status: Arc<dyn StatusReporter>) -> Self {
        self.status = status;
        self
    }

    /// Set the snapshot store used at commit
    pub fn with_store(mut self, store: SnapshotStore) -> Self {
        self.store = store;
        self
    }

    /// Start from a known snapshot
    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = RwLock::new(snapshot);
        self
    }

    /// Replace the in-memory snapshot with the store's persisted one
    pub async fn load_snapshot(self) -> Result<Self> {
        let snapshot = self.store.load().await?;
        Ok(self.with_snapshot(snapshot))
    }

    /// Get the vault name stripped from archive paths
    pub fn vault_name(&self) -> &str {
        &self.vault_name
    }

    /// Get the current phase
    pub fn phase(&self) -> SyncPhase {
        self.phase.get()
    }

    /// Get a copy of the last committed snapshot
    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }

    /// Run one sync transaction unless one is already in flight
    ///
    /// On failure the snapshot is untouched, the status is set to
    /// [`SyncStatus::Failed`] and the error is returned.
    pub async fn trigger(&self) -> Result<SyncOutcome> {
        if let Err(phase) = self.phase.try_begin() {
            info!("Sync already in progress ({}), skipping", phase);
            return Ok(SyncOutcome::Skipped { phase });
        }
        let _guard = PhaseGuard(&self.phase);

        let transaction_id = Uuid::new_v4();
        let span = info_span!("sync", transaction = %transaction_id);

        match self.run(transaction_id).instrument(span.clone()).await {
            Ok(report) => {
                self.phase.advance(SyncPhase::Idle);
                Ok(SyncOutcome::Completed(report))
            }
            Err(e) => {
                let _entered = span.enter();
                self.phase.advance(SyncPhase::Aborted);
                error!("Sync aborted: {}", e);
                self.status.set_status(SyncStatus::Failed);
                Err(e)
            }
        }
    }

    /// Record a host change notification
    ///
    /// Notifications are advisory: they never start a transaction or touch
    /// the snapshot.
    pub fn observe(&self, event: &HostEvent) {
        match event {
            HostEvent::Modified { path } => debug!("File modified: {}", path),
            HostEvent::Created { path } => debug!("File created: {}", path),
            HostEvent::Removed { path } => debug!("File removed: {}", path),
            HostEvent::Renamed { from, to } => debug!("File renamed: {} -> {}", from, to),
        }
    }

    async fn run(&self, transaction_id: Uuid) -> Result<SyncReport> {
        let started = Instant::now();
        let mut report = SyncReport::new(transaction_id);
        self.status.set_status(SyncStatus::Syncing);

        // Diffing
        let snapshot = self.snapshot().await;
        let files = self.host.list_files().await?;
        let change_set =
            compute_change_set(&files, &snapshot, snapshot.recency_threshold_millis());
        info!(
            "Detected {} added, {} modified, {} deleted",
            change_set.added.len(),
            change_set.modified.len(),
            change_set.deleted.len()
        );
        let all_paths: BTreeSet<String> = files.into_iter().map(|f| f.path).collect();

        // Requesting
        self.phase.advance(SyncPhase::Requesting);
        let request = build_request(
            &change_set,
            |path| {
                let host = Arc::clone(&self.host);
                async move {
                    let kind = ContentKind::from_path(&path);
                    host.read_bytes(&path, kind).await
                }
            },
            all_paths,
            snapshot.last_sync_timestamp,
        )
        .await?;
        report.uploaded = request.uploaded_paths().map(ToString::to_string).collect();
        report.reported_deletions = request.deleted_client_paths.iter().cloned().collect();

        // Transmitting
        self.phase.advance(SyncPhase::Transmitting);
        let reply = self.transport.exchange(&request).await?;
        let response = parse_response(&reply.body, reply.deleted_files_header.as_deref())?;
        info!(
            "Server sent {} files and {} deletions",
            response.files_to_write.len(),
            response.deleted_server_paths.len()
        );

        // Applying
        self.phase.advance(SyncPhase::Applying);
        self.apply(&response, &mut report).await;
        match reap(self.host.as_ref()).await {
            Ok(removed) => report.directories_removed = removed,
            Err(e) => warn!("Failed to remove empty directories: {}", e),
        }

        // Committing
        self.phase.advance(SyncPhase::Committing);
        let listing = self.host.list_files().await?;
        let committed = Snapshot::new(listing.into_iter().map(|f| f.path), now_seconds());
        report.known_paths = committed.known_paths.len();
        report.committed_at = committed.last_sync_timestamp;
        *self.snapshot.write().await = committed.clone();
        if let Err(e) = self.store.persist(&committed).await {
            warn!("Committed snapshot was not persisted: {}", e);
        }

        report.duration = started.elapsed();
        self.status.set_status(SyncStatus::UpToDate);
        info!(
            "Sync complete: {} uploaded, {} written, {} deleted, {} skipped in {:?}",
            report.uploaded.len(),
            report.written.len(),
            report.deleted.len(),
            report.skipped.len(),
            report.duration
        );
        Ok(report)
    }

    async fn apply(&self, response: &SyncResponse, report: &mut SyncReport) {
        let writes = response.files_to_write.iter().map(|entry| async move {
            let path = strip_vault_prefix(&entry.archive_path, &self.vault_name).to_string();
            let result = self.write_entry(&path, &entry.bytes).await;
            (path, result)
        });

        // All writes land before any deletion starts
        for (path, result) in join_all(writes).await {
            match result {
                Ok(()) => {
                    debug!("Wrote {}", path);
                    report.written.push(path);
                }
                Err(e) => report.skip(path, &e),
            }
        }

        for path in &response.deleted_server_paths {
            match self.host.delete(path).await {
                Ok(()) => {
                    debug!("Deleted {}", path);
                    report.deleted.push(path.clone());
                }
                Err(e) => {
                    let e = match e {
                        Error::Apply { .. } => e,
                        other => Error::apply(path.as_str(), other),
                    };
                    report.skip(path.clone(), &e);
                }
            }
        }
    }

    async fn write_entry(&self, path: &str, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = parent_dir(path) {
            if let Err(e) = self.host.create_directory(parent).await {
                let e = match e {
                    Error::DirectoryCreate { .. } => e,
                    other => Error::directory_create(parent, other),
                };
                warn!("{}; writing anyway", e);
            }
        }

        self.host
            .write_bytes(path, bytes)
            .await
            .map_err(|e| match e {
                Error::Apply { .. } => e,
                other => Error::apply(path, other),
            })
    }
}

fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::FsVault;
    use async_trait::async_trait;
    use selfsync_types::{SyncRequest, TransportReply};
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Offline;

    #[async_trait]
    impl SyncTransport for Offline {
        async fn exchange(&self, _request: &SyncRequest) -> Result<TransportReply> {
            Err(Error::transport("connection refused"))
        }
    }

    #[derive(Default)]
    struct Statuses(Mutex<Vec<SyncStatus>>);

    impl StatusReporter for Statuses {
        fn set_status(&self, status: SyncStatus) {
            self.0.lock().unwrap().push(status);
        }
    }

    #[tokio::test]
    async fn test_transport_failure_aborts() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.md"), "# a").unwrap();

        let statuses = Arc::new(Statuses::default());
        let before = Snapshot::new(["old.md"], 100.0);
        let coordinator = SyncCoordinator::new(
            Arc::new(FsVault::new(temp_dir.path())),
            Arc::new(Offline),
            "vault",
        )
        .with_status(statuses.clone())
        .with_snapshot(before.clone());

        let err = coordinator.trigger().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(coordinator.snapshot().await, before);
        assert_eq!(coordinator.phase(), SyncPhase::Idle);
        assert_eq!(
            *statuses.0.lock().unwrap(),
            vec![SyncStatus::Syncing, SyncStatus::Failed]
        );
    }

    #[tokio::test]
    async fn test_observe_is_advisory() {
        let temp_dir = TempDir::new().unwrap();
        let coordinator = SyncCoordinator::new(
            Arc::new(FsVault::new(temp_dir.path())),
            Arc::new(Offline),
            "vault",
        );

        coordinator.observe(&HostEvent::Modified {
            path: "a.md".to_string(),
        });
        coordinator.observe(&HostEvent::Renamed {
            from: "a.md".to_string(),
            to: "b.md".to_string(),
        });

        assert!(coordinator.snapshot().await.is_fresh());
        assert_eq!(coordinator.phase(), SyncPhase::Idle);
    }
}
