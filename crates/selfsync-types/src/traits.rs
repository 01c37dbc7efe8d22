//! Collaborator traits for the sync core
//!
//! The sync core never touches storage or the network directly. A host adapter
//! implements [`VaultHost`], a transport implements [`SyncTransport`], and the
//! UI layer implements [`StatusReporter`].

use crate::{
    ContentKind, DirectoryEntry, FileRecord, Result, SyncRequest, SyncStatus, TransportReply,
    VaultEntry,
};
use async_trait::async_trait;

/// Storage capabilities of the host that owns the vault
#[async_trait]
pub trait VaultHost: Send + Sync {
    /// List every file and directory below the vault root
    async fn list_entries(&self) -> Result<Vec<VaultEntry>>;

    /// Read a file in the given mode
    async fn read_bytes(&self, path: &str, kind: ContentKind) -> Result<Vec<u8>>;

    /// Create or replace a file
    async fn write_bytes(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Create a directory and any missing ancestors; existing directories are fine
    async fn create_directory(&self, path: &str) -> Result<()>;

    /// Delete a file or directory
    async fn delete(&self, path: &str) -> Result<()>;

    /// List only the files of the vault
    async fn list_files(&self) -> Result<Vec<FileRecord>> {
        Ok(self
            .list_entries()
            .await?
            .into_iter()
            .filter_map(|entry| match entry {
                VaultEntry::File(record) => Some(record),
                VaultEntry::Directory(_) => None,
            })
            .collect())
    }

    /// List only the directories of the vault
    async fn list_all_directories(&self) -> Result<Vec<DirectoryEntry>> {
        Ok(self
            .list_entries()
            .await?
            .into_iter()
            .filter_map(|entry| match entry {
                VaultEntry::Directory(dir) => Some(dir),
                VaultEntry::File(_) => None,
            })
            .collect())
    }
}

/// Network exchange with the sync server
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Send one request and return the raw reply of a successful exchange
    ///
    /// Connection failures and non-2xx statuses are reported as
    /// [`crate::Error::Transport`].
    async fn exchange(&self, request: &SyncRequest) -> Result<TransportReply>;
}

/// Trait for reporting the user-visible sync status
pub trait StatusReporter: Send + Sync {
    /// Report a status change
    fn set_status(&self, status: SyncStatus);
}

/// A status reporter that discards every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStatus;

impl StatusReporter for NoopStatus {
    fn set_status(&self, _status: SyncStatus) {}
}
