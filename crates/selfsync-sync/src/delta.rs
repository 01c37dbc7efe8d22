//! Local change detection against the last committed snapshot

use crate::snapshot::Snapshot;
use selfsync_types::{extension, FileRecord, Millis};
use std::collections::BTreeSet;

/// Extensions whose in-place modifications are uploaded
pub const ELIGIBLE_EXTENSIONS: &[&str] = &["md", "jpg", "png", "pdf"];

/// Check whether a path's extension is on the sync allow-list (case-sensitive)
pub fn is_eligible(path: &str) -> bool {
    extension(path).is_some_and(|ext| ELIGIBLE_EXTENSIONS.contains(&ext))
}

/// Local changes since the last committed sync
///
/// `added`, `modified` and `deleted` are pairwise disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Paths present now but not in the snapshot
    pub added: BTreeSet<String>,
    /// Known paths modified after the last sync
    pub modified: BTreeSet<String>,
    /// Known paths no longer present
    pub deleted: BTreeSet<String>,
}

impl ChangeSet {
    /// Check whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Paths whose content must be uploaded, in sorted order
    pub fn upload_paths(&self) -> BTreeSet<&str> {
        self.added
            .iter()
            .chain(&self.modified)
            .map(String::as_str)
            .collect()
    }
}

/// Compute the change set of `current_files` relative to `snapshot`
///
/// A known file counts as modified when its modification time is strictly
/// above `recency_threshold_millis` and its extension is eligible. Additions
/// and deletions are never filtered by type.
pub fn compute_change_set(
    current_files: &[FileRecord],
    snapshot: &Snapshot,
    recency_threshold_millis: Millis,
) -> ChangeSet {
    let current: BTreeSet<&str> = current_files.iter().map(|f| f.path.as_str()).collect();
    let known = &snapshot.known_paths;

    let deleted = known
        .iter()
        .filter(|path| !current.contains(path.as_str()))
        .cloned()
        .collect();

    let added = current
        .iter()
        .filter(|path| !known.contains(**path))
        .map(|path| (*path).to_string())
        .collect();

    let modified = current_files
        .iter()
        .filter(|f| {
            known.contains(&f.path)
                && f.modified_at_millis > recency_threshold_millis
                && is_eligible(&f.path)
        })
        .map(|f| f.path.clone())
        .collect();

    ChangeSet {
        added,
        modified,
        deleted,
    }
}
