//! JSON output structures for the SelfSync CLI

use selfsync_sync::{SkippedItem, SyncReport};
use serde::{Deserialize, Serialize};

/// Complete JSON output for a sync transaction
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncReportJson {
    /// Operation metadata
    pub metadata: OperationMetadata,
    /// Paths uploaded to the server
    pub uploaded: Vec<String>,
    /// Local deletions reported to the server
    pub reported_deletions: Vec<String>,
    /// Paths written from the server's archive
    pub written: Vec<String>,
    /// Paths deleted at the server's request
    pub deleted: Vec<String>,
    /// Per-item apply failures
    pub skipped: Vec<SkippedItemJson>,
    /// Empty directories removed
    pub directories_removed: usize,
    /// Number of paths in the committed snapshot
    pub known_paths: usize,
    /// Commit time in epoch seconds
    pub committed_at: f64,
    /// Duration in milliseconds
    pub duration_ms: u128,
}

/// Operation metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationMetadata {
    /// SelfSync version
    pub version: String,
    /// Transaction ID
    pub transaction_id: String,
    /// Vault name
    pub vault: String,
    /// RFC 3339 timestamp of the report
    pub timestamp: String,
}

/// A skipped item in JSON format
#[derive(Debug, Serialize, Deserialize)]
pub struct SkippedItemJson {
    /// Vault path
    pub path: String,
    /// Failure category
    pub kind: String,
    /// Failure description
    pub reason: String,
}

impl From<&SkippedItem> for SkippedItemJson {
    fn from(item: &SkippedItem) -> Self {
        Self {
            path: item.path.clone(),
            kind: format!("{:?}", item.kind),
            reason: item.reason.clone(),
        }
    }
}

impl SyncReportJson {
    /// Build the JSON view of a report
    pub fn new(report: &SyncReport, vault: &str) -> Self {
        Self {
            metadata: OperationMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                transaction_id: report.transaction_id.to_string(),
                vault: vault.to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
            uploaded: report.uploaded.clone(),
            reported_deletions: report.reported_deletions.clone(),
            written: report.written.clone(),
            deleted: report.deleted.clone(),
            skipped: report.skipped.iter().map(SkippedItemJson::from).collect(),
            directories_removed: report.directories_removed,
            known_paths: report.known_paths,
            committed_at: report.committed_at,
            duration_ms: report.duration.as_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selfsync_types::ErrorKind;
    use std::time::Duration;

    #[test]
    fn test_report_json() {
        let report = SyncReport {
            transaction_id: uuid::Uuid::new_v4(),
            uploaded: vec!["a.md".to_string()],
            reported_deletions: Vec::new(),
            written: vec!["c.png".to_string()],
            deleted: vec!["a.md".to_string()],
            skipped: vec![SkippedItem {
                path: "locked.pdf".to_string(),
                kind: ErrorKind::Apply,
                reason: "permission denied".to_string(),
            }],
            directories_removed: 1,
            known_paths: 2,
            committed_at: 1_712_345_678.5,
            duration: Duration::from_millis(250),
        };

        let json = SyncReportJson::new(&report, "testing");
        let value = serde_json::to_value(&json).unwrap();
        assert_eq!(value["metadata"]["vault"], "testing");
        assert_eq!(value["skipped"][0]["kind"], "Apply");
        assert_eq!(value["duration_ms"], 250);
        assert_eq!(value["written"][0], "c.png");
    }
}
