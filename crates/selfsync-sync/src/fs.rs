//! Filesystem-backed vault host

use async_trait::async_trait;
use filetime::FileTime;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use selfsync_config::{Config, DeleteMode};
use selfsync_types::{
    ContentKind, DirectoryEntry, Error, FileRecord, HostEvent, Millis, Result, VaultEntry,
    VaultHost,
};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// Name of the trash directory inside the state directory
pub const TRASH_DIR: &str = "trash";

/// A vault stored in a local directory
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
    state_dir: String,
    delete_mode: DeleteMode,
    include_hidden: bool,
}

impl FsVault {
    /// Create a vault host for `root` with default settings
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            state_dir: ".selfsync".to_string(),
            delete_mode: DeleteMode::Trash,
            include_hidden: false,
        }
    }

    /// Create a vault host from the `vault` section of a configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            root: config.vault.root.clone(),
            state_dir: config.vault.state_dir.clone(),
            delete_mode: config.vault.delete_mode,
            include_hidden: config.vault.include_hidden,
        }
    }

    /// Set the deletion behavior
    pub fn with_delete_mode(mut self, delete_mode: DeleteMode) -> Self {
        self.delete_mode = delete_mode;
        self
    }

    /// Include dot-prefixed entries in listings
    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    /// Get the vault root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the trash directory
    pub fn trash_path(&self) -> PathBuf {
        self.root.join(&self.state_dir).join(TRASH_DIR)
    }

    /// Start watching the vault for changes
    pub fn watch(&self) -> Result<VaultWatcher> {
        let root = std::fs::canonicalize(&self.root)
            .map_err(|e| Error::host(format!("Failed to resolve vault root: {}", e)))?;
        let filter = self.clone();
        let (tx, rx) = mpsc::unbounded_channel();

        let watch_root = root.clone();
        let mut watcher = notify::recommended_watcher(move |evt: notify::Result<Event>| {
            match evt {
                Ok(event) => {
                    for host_event in filter.translate(&watch_root, &event) {
                        // Receiver gone means the watcher is being dropped
                        drop(tx.send(host_event));
                    }
                }
                Err(e) => warn!("Watch error: {}", e),
            }
        })
        .map_err(|e| Error::host(format!("Failed to create watcher: {}", e)))?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| Error::host(format!("Failed to watch '{}': {}", root.display(), e)))?;

        Ok(VaultWatcher {
            _watcher: watcher,
            events: rx,
        })
    }

    fn translate(&self, root: &Path, event: &Event) -> Vec<HostEvent> {
        let paths: Vec<String> = event
            .paths
            .iter()
            .filter_map(|p| self.vault_path(root, p))
            .collect();

        match event.kind {
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() == 2 => {
                vec![HostEvent::Renamed {
                    from: paths[0].clone(),
                    to: paths[1].clone(),
                }]
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => paths
                .into_iter()
                .map(|path| HostEvent::Removed { path })
                .collect(),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) | EventKind::Create(_) => paths
                .into_iter()
                .map(|path| HostEvent::Created { path })
                .collect(),
            EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
            EventKind::Modify(_) => paths
                .into_iter()
                .map(|path| HostEvent::Modified { path })
                .collect(),
            EventKind::Any | EventKind::Access(_) | EventKind::Other => Vec::new(),
        }
    }

    /// Convert an absolute path into a vault path, dropping excluded entries
    fn vault_path(&self, root: &Path, path: &Path) -> Option<String> {
        let path = relative_path(root, path)?;
        let excluded = path.split('/').next() == Some(self.state_dir.as_str())
            || (!self.include_hidden && path.split('/').any(|s| s.starts_with('.')));
        (!excluded).then_some(path)
    }

    /// Resolve a vault path below the root
    ///
    /// Paths escaping the root or reaching into the state directory are
    /// rejected.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        if path.is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(Error::host(format!(
                "Path '{}' is not inside the vault",
                path
            )));
        }
        if relative.components().next() == Some(Component::Normal(OsStr::new(&self.state_dir))) {
            return Err(Error::host(format!(
                "Path '{}' is inside the state directory",
                path
            )));
        }
        Ok(self.root.join(relative))
    }

    fn list_blocking(&self) -> Result<Vec<VaultEntry>> {
        let mut entries = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                if entry.depth() == 1 && name == self.state_dir.as_str() {
                    return false;
                }
                self.include_hidden || !name.starts_with('.')
            });

        for entry in walker {
            let entry = entry.map_err(|e| Error::host(format!("Failed to list vault: {}", e)))?;
            let Some(path) = relative_path(&self.root, entry.path()) else {
                continue;
            };

            let file_type = entry.file_type();
            if file_type.is_file() {
                let metadata = entry
                    .metadata()
                    .map_err(|e| Error::host(format!("Failed to stat '{}': {}", path, e)))?;
                let mtime = FileTime::from_last_modification_time(&metadata);
                entries.push(VaultEntry::File(FileRecord::new(path, to_millis(mtime))));
            } else if file_type.is_dir() {
                let child_count = std::fs::read_dir(entry.path())
                    .map_err(|e| Error::host(format!("Failed to read '{}': {}", path, e)))?
                    .count();
                entries.push(VaultEntry::Directory(DirectoryEntry { path, child_count }));
            }
        }

        Ok(entries)
    }

    /// Move `target` to `trash/<millis>-<uuid>/<path>`
    ///
    /// Every call gets its own batch directory, so a directory trashed right
    /// after one of its files never lands on an existing destination.
    async fn move_to_trash(&self, path: &str, target: &Path) -> Result<()> {
        let batch = format!(
            "{}-{}",
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        let destination = self.trash_path().join(batch).join(path);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::apply(path, e))?;
        }
        fs::rename(target, &destination)
            .await
            .map_err(|e| Error::apply(path, e))?;
        debug!("Moved {} to {}", path, destination.display());
        Ok(())
    }
}

#[async_trait]
impl VaultHost for FsVault {
    async fn list_entries(&self) -> Result<Vec<VaultEntry>> {
        let vault = self.clone();
        tokio::task::spawn_blocking(move || vault.list_blocking())
            .await
            .map_err(|e| Error::host(format!("Listing task failed: {}", e)))?
    }

    async fn read_bytes(&self, path: &str, kind: ContentKind) -> Result<Vec<u8>> {
        let target = self.resolve(path)?;
        let bytes = fs::read(&target).await.map_err(|e| Error::read(path, e))?;
        match kind {
            // Notes in a legacy encoding are uploaded with replacement characters
            ContentKind::Text => match String::from_utf8(bytes) {
                Ok(text) => Ok(text.into_bytes()),
                Err(e) => {
                    warn!("{} is not valid UTF-8; replacing invalid sequences", path);
                    Ok(String::from_utf8_lossy(e.as_bytes()).into_owned().into_bytes())
                }
            },
            ContentKind::Binary => Ok(bytes),
        }
    }

    async fn write_bytes(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let target = self.resolve(path)?;
        fs::write(&target, bytes)
            .await
            .map_err(|e| Error::apply(path, e))
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        fs::create_dir_all(&target)
            .await
            .map_err(|e| Error::directory_create(path, e))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        let metadata = match fs::symlink_metadata(&target).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Nothing to delete at {}", path);
                return Ok(());
            }
            Err(e) => return Err(Error::apply(path, e)),
        };

        match self.delete_mode {
            DeleteMode::Trash => self.move_to_trash(path, &target).await,
            DeleteMode::Permanent if metadata.is_dir() => fs::remove_dir_all(&target)
                .await
                .map_err(|e| Error::apply(path, e)),
            DeleteMode::Permanent => fs::remove_file(&target)
                .await
                .map_err(|e| Error::apply(path, e)),
        }
    }
}

/// Change notifications for an [`FsVault`]
///
/// Watching stops when this value is dropped.
pub struct VaultWatcher {
    _watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<HostEvent>,
}

impl VaultWatcher {
    /// Wait for the next change notification
    pub async fn next_event(&mut self) -> Option<HostEvent> {
        self.events.recv().await
    }
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Option<Vec<&str>> = relative
        .components()
        .map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .collect();
    segments.map(|s| s.join("/")).filter(|s| !s.is_empty())
}

fn to_millis(time: FileTime) -> Millis {
    time.unix_seconds() * 1000 + Millis::from(time.nanoseconds() / 1_000_000)
}
