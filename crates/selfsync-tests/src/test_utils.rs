//! In-memory collaborators for driving the sync coordinator in tests

use async_trait::async_trait;
use selfsync_sync::{pack_archive, ArchiveEntry};
use selfsync_types::{
    parent_dir, ContentKind, DirectoryEntry, Error, FileRecord, Millis, Result, StatusReporter,
    SyncRequest, SyncStatus, SyncTransport, TransportReply, VaultEntry, VaultHost,
};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

/// Current wall-clock time in milliseconds
pub fn now_millis() -> Millis {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Default)]
struct VaultState {
    files: BTreeMap<String, (Vec<u8>, Millis)>,
    directories: BTreeSet<String>,
    failing_reads: BTreeSet<String>,
    failing_writes: BTreeSet<String>,
    failing_deletes: BTreeSet<String>,
    failing_directories: BTreeSet<String>,
    fail_listing: bool,
    reads: Vec<String>,
}

impl VaultState {
    fn add_directory_tree(&mut self, dir: &str) {
        let mut current = Some(dir);
        while let Some(dir) = current {
            self.directories.insert(dir.to_string());
            current = parent_dir(dir);
        }
    }

    fn has_parent(&self, path: &str) -> bool {
        parent_dir(path).map_or(true, |dir| self.directories.contains(dir))
    }

    fn remove_tree(&mut self, dir: &str) {
        let prefix = format!("{}/", dir);
        self.directories.remove(dir);
        self.files.retain(|path, _| !path.starts_with(&prefix));
        self.directories.retain(|path| !path.starts_with(&prefix));
    }
}

/// A vault held in memory
///
/// Like a real filesystem, directories outlive their files and a write needs
/// its parent directory to exist. Individual paths can be made to fail.
#[derive(Debug, Default)]
pub struct MemoryVault {
    state: Mutex<VaultState>,
}

impl MemoryVault {
    /// Create an empty vault
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a vault holding the given files, stamped with the current time
    pub fn with_files<I, P, B>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, B)>,
        P: Into<String>,
        B: Into<Vec<u8>>,
    {
        let vault = Self::new();
        for (path, bytes) in files {
            vault.insert(path, bytes, now_millis());
        }
        vault
    }

    fn lock(&self) -> MutexGuard<'_, VaultState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Place a file with an explicit modification time
    pub fn insert<P: Into<String>, B: Into<Vec<u8>>>(&self, path: P, bytes: B, modified: Millis) {
        let path = path.into();
        let mut state = self.lock();
        if let Some(dir) = parent_dir(&path) {
            state.add_directory_tree(dir);
        }
        state.files.insert(path, (bytes.into(), modified));
    }

    /// Edit a file as a user would, after any sync that already committed
    pub fn modify<P: Into<String>, B: Into<Vec<u8>>>(&self, path: P, bytes: B) {
        self.insert(path, bytes, now_millis() + 1);
    }

    /// Remove a file as a user would
    pub fn remove(&self, path: &str) {
        self.lock().files.remove(path);
    }

    /// Create a possibly empty directory and its ancestors
    pub fn add_directory(&self, path: &str) {
        self.lock().add_directory_tree(path);
    }

    /// Get a file's content
    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).map(|(bytes, _)| bytes.clone())
    }

    /// Get every file path
    pub fn file_paths(&self) -> BTreeSet<String> {
        self.lock().files.keys().cloned().collect()
    }

    /// Get every directory path
    pub fn directory_paths(&self) -> BTreeSet<String> {
        self.lock().directories.clone()
    }

    /// Get the paths read so far, in order
    pub fn reads(&self) -> Vec<String> {
        self.lock().reads.clone()
    }

    /// Make reads of `path` fail
    pub fn fail_read<P: Into<String>>(&self, path: P) {
        self.lock().failing_reads.insert(path.into());
    }

    /// Make writes to `path` fail
    pub fn fail_write<P: Into<String>>(&self, path: P) {
        self.lock().failing_writes.insert(path.into());
    }

    /// Make deletion of `path` fail
    pub fn fail_delete<P: Into<String>>(&self, path: P) {
        self.lock().failing_deletes.insert(path.into());
    }

    /// Make creation of directory `path` fail
    pub fn fail_create_directory<P: Into<String>>(&self, path: P) {
        self.lock().failing_directories.insert(path.into());
    }

    /// Make every listing fail
    pub fn fail_listing(&self, fail: bool) {
        self.lock().fail_listing = fail;
    }
}

#[async_trait]
impl VaultHost for MemoryVault {
    async fn list_entries(&self) -> Result<Vec<VaultEntry>> {
        let state = self.lock();
        if state.fail_listing {
            return Err(Error::host("listing unavailable"));
        }

        let mut entries: Vec<VaultEntry> = state
            .directories
            .iter()
            .map(|dir| {
                let child_count = state
                    .files
                    .keys()
                    .chain(state.directories.iter())
                    .filter(|path| parent_dir(path) == Some(dir.as_str()))
                    .count();
                VaultEntry::Directory(DirectoryEntry {
                    path: dir.clone(),
                    child_count,
                })
            })
            .collect();

        entries.extend(
            state
                .files
                .iter()
                .map(|(path, (_, modified))| VaultEntry::File(FileRecord::new(path.clone(), *modified))),
        );
        Ok(entries)
    }

    async fn read_bytes(&self, path: &str, kind: ContentKind) -> Result<Vec<u8>> {
        let mut state = self.lock();
        state.reads.push(path.to_string());
        if state.failing_reads.contains(path) {
            return Err(Error::read(path, "injected read failure"));
        }

        let bytes = state
            .files
            .get(path)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| Error::read(path, "no such file"))?;

        if kind == ContentKind::Text && std::str::from_utf8(&bytes).is_err() {
            return Err(Error::read(path, "not valid UTF-8"));
        }
        Ok(bytes)
    }

    async fn write_bytes(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.failing_writes.contains(path) {
            return Err(Error::apply(path, "injected write failure"));
        }
        if !state.has_parent(path) {
            return Err(Error::apply(path, "parent directory does not exist"));
        }
        state
            .files
            .insert(path.to_string(), (bytes.to_vec(), now_millis()));
        Ok(())
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        let mut state = self.lock();
        if state.failing_directories.contains(path) {
            return Err(Error::directory_create(path, "injected mkdir failure"));
        }
        state.add_directory_tree(path);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let mut state = self.lock();
        if state.failing_deletes.contains(path) {
            return Err(Error::apply(path, "injected delete failure"));
        }
        // Missing paths are already gone
        if state.files.remove(path).is_none() {
            state.remove_tree(path);
        }
        Ok(())
    }
}

/// Lets a test hold a scripted exchange open
#[derive(Debug, Default)]
pub struct Gate {
    entered: Notify,
    released: Notify,
}

impl Gate {
    /// Wait until an exchange is in flight
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the held exchange reply
    pub fn release(&self) {
        self.released.notify_one();
    }
}

/// A transport replaying queued replies and recording every request
///
/// Once the queue is empty it answers with an empty archive.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<TransportReply>>>,
    requests: Mutex<Vec<SyncRequest>>,
    gate: Option<Arc<Gate>>,
}

impl ScriptedTransport {
    /// Create a transport with no queued replies
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply carrying `entries` and a `Deleted-Files` header
    pub fn reply(self, entries: &[ArchiveEntry], deleted_files: Option<&str>) -> Self {
        let reply = pack_archive(entries).map(|body| TransportReply {
            body,
            deleted_files_header: deleted_files.map(ToString::to_string),
        });
        self.push(reply)
    }

    /// Queue a raw reply
    pub fn reply_raw(self, reply: TransportReply) -> Self {
        self.push(Ok(reply))
    }

    /// Queue a failure
    pub fn fail(self, error: Error) -> Self {
        self.push(Err(error))
    }

    /// Hold every exchange until the returned gate is released
    pub fn gated(mut self) -> (Self, Arc<Gate>) {
        let gate = Arc::new(Gate::default());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    fn push(self, reply: Result<TransportReply>) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(reply);
        self
    }

    /// Get every request received so far
    pub fn requests(&self) -> Vec<SyncRequest> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SyncTransport for ScriptedTransport {
    async fn exchange(&self, request: &SyncRequest) -> Result<TransportReply> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(request.clone());

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.released.notified().await;
        }

        let next = self
            .replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front();
        match next {
            Some(reply) => reply,
            None => Ok(TransportReply {
                body: pack_archive(&[])?,
                deleted_files_header: None,
            }),
        }
    }
}

/// A status reporter keeping every update
#[derive(Debug, Default)]
pub struct RecordingStatus {
    statuses: Mutex<Vec<SyncStatus>>,
}

impl RecordingStatus {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Get every status reported so far
    pub fn statuses(&self) -> Vec<SyncStatus> {
        self.statuses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Get the latest status
    pub fn last(&self) -> Option<SyncStatus> {
        self.statuses().last().copied()
    }
}

impl StatusReporter for RecordingStatus {
    fn set_status(&self, status: SyncStatus) {
        self.statuses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(status);
    }
}
