//! Removal of directories left empty after a sync

use selfsync_types::{Result, VaultHost};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Delete empty directories until none remain
///
/// Each pass lists the vault's directories and deletes those without
/// children, so a parent emptied by its child's removal goes in a later pass.
/// Stops early when a pass removes nothing. Returns the number removed.
pub async fn reap(host: &dyn VaultHost) -> Result<usize> {
    let mut removed = 0;
    let mut failed = BTreeSet::new();

    loop {
        let empty: Vec<String> = host
            .list_all_directories()
            .await?
            .into_iter()
            .filter(|dir| dir.child_count == 0 && !failed.contains(&dir.path))
            .map(|dir| dir.path)
            .collect();

        if empty.is_empty() {
            break;
        }

        let mut removed_this_pass = 0;
        for path in empty {
            match host.delete(&path).await {
                Ok(()) => {
                    debug!("Removed empty directory: {}", path);
                    removed_this_pass += 1;
                }
                Err(e) => {
                    warn!("Failed to remove empty directory '{}': {}", path, e);
                    failed.insert(path);
                }
            }
        }

        if removed_this_pass == 0 {
            break;
        }
        removed += removed_this_pass;
    }

    Ok(removed)
}
