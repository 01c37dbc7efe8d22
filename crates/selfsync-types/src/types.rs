//! Core data types for SelfSync
//!
//! This module provides the plain data values that travel between the host,
//! the sync core and the transport.

use std::collections::BTreeSet;
use std::fmt;

/// Vault-relative path using `/` separators
pub type VaultPath = String;

/// Milliseconds since the Unix epoch
pub type Millis = i64;

/// How a file's bytes are read from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// UTF-8 text, read through the host's text path
    Text,
    /// Raw bytes
    Binary,
}

impl ContentKind {
    /// Extensions read in text mode
    pub const TEXT_EXTENSIONS: &'static [&'static str] = &["md"];

    /// Resolve the read mode from a path's extension
    pub fn from_path(path: &str) -> Self {
        match extension(path) {
            Some(ext) if Self::TEXT_EXTENSIONS.contains(&ext) => Self::Text,
            _ => Self::Binary,
        }
    }
}

/// Return the extension of the final path segment, without the dot
pub fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

/// Return the parent directory of a vault path, if it has one
pub fn parent_dir(path: &str) -> Option<&str> {
    path.rfind('/').map(|idx| &path[..idx]).filter(|p| !p.is_empty())
}

/// A file as listed by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Vault-relative path
    pub path: VaultPath,
    /// Read mode resolved from the extension
    pub content_kind: ContentKind,
    /// Last modification time
    pub modified_at_millis: Millis,
}

impl FileRecord {
    /// Create a record, resolving the content kind from the path
    pub fn new<P: Into<String>>(path: P, modified_at_millis: Millis) -> Self {
        let path = path.into();
        Self {
            content_kind: ContentKind::from_path(&path),
            path,
            modified_at_millis,
        }
    }
}

/// A directory as listed by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Vault-relative path
    pub path: VaultPath,
    /// Number of direct children
    pub child_count: usize,
}

/// One entry of a host listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEntry {
    /// A regular file
    File(FileRecord),
    /// A directory (never the vault root)
    Directory(DirectoryEntry),
}

impl VaultEntry {
    /// Get the entry's path
    pub fn path(&self) -> &str {
        match self {
            Self::File(record) => &record.path,
            Self::Directory(dir) => &dir.path,
        }
    }
}

/// A change notification from the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// File content changed
    Modified {
        /// Affected path
        path: VaultPath,
    },
    /// File moved or renamed
    Renamed {
        /// Previous path
        from: VaultPath,
        /// New path
        to: VaultPath,
    },
    /// Entry created
    Created {
        /// Affected path
        path: VaultPath,
    },
    /// Entry removed
    Removed {
        /// Affected path
        path: VaultPath,
    },
}

/// User-visible sync status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// A transaction is in flight
    Syncing,
    /// The last transaction committed
    UpToDate,
    /// The last transaction aborted
    Failed,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syncing => write!(f, "Syncing..."),
            Self::UpToDate => write!(f, "Up To Date"),
            Self::Failed => write!(f, "Sync Failed"),
        }
    }
}

/// A named blob in the upload part of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBlob {
    /// Blob name (the vault path, or the placeholder name)
    pub name: String,
    /// File content
    pub bytes: Vec<u8>,
}

impl UploadBlob {
    /// Name of the empty blob sent when nothing changed locally
    ///
    /// The server only checks the name of the first blob, so a vault file
    /// called `empty` that sorts first is read as this placeholder.
    pub const PLACEHOLDER_NAME: &'static str = "empty";

    /// Create a blob for a vault file
    pub fn new<S: Into<String>>(name: S, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Create the placeholder blob
    pub fn placeholder() -> Self {
        Self::new(Self::PLACEHOLDER_NAME, Vec::new())
    }

    /// Check whether this is the placeholder blob
    pub fn is_placeholder(&self) -> bool {
        self.name == Self::PLACEHOLDER_NAME && self.bytes.is_empty()
    }
}

/// The upload half of one sync transaction
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRequest {
    /// Added and modified files, or a single placeholder
    pub files_to_upload: Vec<UploadBlob>,
    /// Every path currently in the vault
    pub all_client_paths: BTreeSet<VaultPath>,
    /// Paths deleted locally since the last sync
    pub deleted_client_paths: BTreeSet<VaultPath>,
    /// Epoch seconds of the last committed sync
    pub last_sync_timestamp: f64,
}

impl SyncRequest {
    /// Iterate the paths of real (non-placeholder) uploads
    pub fn uploaded_paths(&self) -> impl Iterator<Item = &str> {
        self.files_to_upload
            .iter()
            .filter(|blob| !blob.is_placeholder())
            .map(|blob| blob.name.as_str())
    }

    /// Render the timestamp the way the wire field expects it
    pub fn timestamp_field(&self) -> String {
        self.last_sync_timestamp.to_string()
    }
}

/// The raw reply of a successful exchange
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportReply {
    /// Archive bytes
    pub body: Vec<u8>,
    /// Raw `Deleted-Files` header value, if present
    pub deleted_files_header: Option<String>,
}
