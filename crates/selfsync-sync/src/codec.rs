//! Request assembly and response decoding for one sync exchange

use crate::delta::ChangeSet;
use futures::future::try_join_all;
use selfsync_types::{Error, Result, SyncRequest, UploadBlob};
use std::collections::BTreeSet;
use std::future::Future;
use std::io::{Cursor, Read, Write};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A file carried in the response archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry name inside the archive, prefixed with the vault name
    pub archive_path: String,
    /// File content
    pub bytes: Vec<u8>,
}

impl ArchiveEntry {
    /// Create an archive entry
    pub fn new<S: Into<String>>(archive_path: S, bytes: Vec<u8>) -> Self {
        Self {
            archive_path: archive_path.into(),
            bytes,
        }
    }
}

/// The decoded download half of one sync transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResponse {
    /// Files to create or replace locally
    pub files_to_write: Vec<ArchiveEntry>,
    /// Paths the server deleted
    pub deleted_server_paths: BTreeSet<String>,
}

/// Build the request for a change set
///
/// Every added or modified path is read through `loader`. Reads run
/// concurrently; the first failure aborts the build with [`Error::Read`].
/// An empty upload set is replaced by the placeholder blob. A real file that
/// would be mistaken for the placeholder is sent anyway, with a warning.
pub async fn build_request<F, Fut>(
    change_set: &ChangeSet,
    loader: F,
    all_paths: BTreeSet<String>,
    last_sync_timestamp: f64,
) -> Result<SyncRequest>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Vec<u8>>>,
{
    if shadows_placeholder(change_set) {
        warn!(
            "'{}' leads the upload list and will be read by the server as the empty placeholder; \
             rename it to sync it",
            UploadBlob::PLACEHOLDER_NAME
        );
    }

    let reads = change_set.upload_paths().into_iter().map(|path| {
        let path = path.to_string();
        let read = loader(path.clone());
        async move {
            match read.await {
                Ok(bytes) => Ok(UploadBlob::new(path, bytes)),
                Err(err @ Error::Read { .. }) => Err(err),
                Err(err) => Err(Error::read(path, err)),
            }
        }
    });

    let mut files_to_upload = try_join_all(reads).await?;
    if files_to_upload.is_empty() {
        files_to_upload.push(UploadBlob::placeholder());
    }

    debug!(
        "Built request with {} blobs, {} deletions",
        files_to_upload.len(),
        change_set.deleted.len()
    );

    Ok(SyncRequest {
        files_to_upload,
        all_client_paths: all_paths,
        deleted_client_paths: change_set.deleted.clone(),
        last_sync_timestamp,
    })
}

/// Check whether the first upload carries the placeholder's name
///
/// The server treats a leading blob named `empty` as "nothing uploaded" and
/// discards every file of that request.
pub fn shadows_placeholder(change_set: &ChangeSet) -> bool {
    change_set.upload_paths().first() == Some(&UploadBlob::PLACEHOLDER_NAME)
}

/// Decode a reply body and its `Deleted-Files` header
pub fn parse_response(raw_body: &[u8], header_deleted_paths: Option<&str>) -> Result<SyncResponse> {
    if raw_body.is_empty() {
        return Err(Error::malformed_archive("empty response body"));
    }

    let mut archive = ZipArchive::new(Cursor::new(raw_body)).map_err(Error::malformed_archive)?;
    let mut files_to_write = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(Error::malformed_archive)?;
        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        if !is_contained(&name) || file.enclosed_name().is_none() {
            return Err(Error::malformed_archive(format!(
                "entry '{}' escapes the archive root",
                name
            )));
        }

        let mut bytes = Vec::with_capacity(usize::try_from(file.size()).unwrap_or_default());
        file.read_to_end(&mut bytes)
            .map_err(|e| Error::malformed_archive(format!("entry '{}': {}", name, e)))?;
        files_to_write.push(ArchiveEntry::new(name, bytes));
    }

    Ok(SyncResponse {
        files_to_write,
        deleted_server_paths: parse_deleted_header(header_deleted_paths),
    })
}

/// Split a comma-separated `Deleted-Files` header into trimmed, non-empty paths
pub fn parse_deleted_header(header: Option<&str>) -> BTreeSet<String> {
    header
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Map an archive path to a vault path by removing the leading vault-name segment
///
/// Paths without the prefix are returned unchanged.
pub fn strip_vault_prefix<'a>(archive_path: &'a str, vault_name: &str) -> &'a str {
    archive_path
        .strip_prefix(vault_name)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(archive_path)
}

/// Pack named blobs into a zip archive
pub fn pack_archive(entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        writer
            .start_file(entry.archive_path.as_str(), options)
            .map_err(|e| Error::other(format!("Failed to pack '{}': {}", entry.archive_path, e)))?;
        writer.write_all(&entry.bytes)?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| Error::other(format!("Failed to finish archive: {}", e)))?;
    Ok(cursor.into_inner())
}

fn is_contained(name: &str) -> bool {
    !name.starts_with('/')
        && !name.starts_with('\\')
        && name.split(['/', '\\']).all(|segment| segment != "..")
}
