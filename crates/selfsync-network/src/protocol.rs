//! Wire format of the sync exchange

use reqwest::multipart::{Form, Part};
use selfsync_types::{Error, Result, SyncRequest};

/// Form field carrying one file part per uploaded blob
pub const FILES_FIELD: &str = "modified_and_new_client_files";
/// Repeated form field listing every vault path
pub const ALL_PATHS_FIELD: &str = "all_client_paths";
/// Repeated form field listing local deletions
pub const DELETED_PATHS_FIELD: &str = "deleted_client_paths";
/// Form field carrying the last sync time in epoch seconds
pub const TIMESTAMP_FIELD: &str = "last_sync_timestamp";
/// Response header listing server-side deletions, comma-separated
pub const DELETED_FILES_HEADER: &str = "Deleted-Files";

const BLOB_MIME: &str = "application/octet-stream";

/// Encode a request as a multipart form
pub fn build_form(request: &SyncRequest) -> Result<Form> {
    let mut form = Form::new();

    for path in &request.all_client_paths {
        form = form.text(ALL_PATHS_FIELD, path.clone());
    }

    for blob in &request.files_to_upload {
        let part = Part::bytes(blob.bytes.clone())
            .file_name(blob.name.clone())
            .mime_str(BLOB_MIME)
            .map_err(|e| Error::transport(format!("Invalid part for '{}': {}", blob.name, e)))?;
        form = form.part(FILES_FIELD, part);
    }

    for path in &request.deleted_client_paths {
        form = form.text(DELETED_PATHS_FIELD, path.clone());
    }

    Ok(form.text(TIMESTAMP_FIELD, request.timestamp_field()))
}
