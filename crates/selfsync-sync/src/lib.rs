//! Change-set reconciliation and sync transactions for SelfSync
//!
//! This crate holds the sync core:
//!
//! - **Snapshot Store**: the last committed vault state, persisted as JSON
//! - **Delta Engine**: local additions, modifications and deletions since that snapshot
//! - **Payload Codec**: request assembly and zip/`Deleted-Files` response decoding
//! - **Coordinator**: the one-at-a-time transaction state machine
//! - **Reaper**: removal of directories left empty after applying
//! - **Filesystem host**: a [`selfsync_types::VaultHost`] over a local directory
//!
//! # Examples
//!
//! ```rust,no_run
//! use selfsync_sync::{FsVault, SnapshotStore, SyncCoordinator};
//! use selfsync_types::{Result, SyncRequest, SyncTransport, TransportReply};
//! use std::sync::Arc;
//!
//! struct Server;
//!
//! #[async_trait::async_trait]
//! impl SyncTransport for Server {
//!     async fn exchange(&self, _request: &SyncRequest) -> Result<TransportReply> {
//!         unimplemented!()
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let coordinator = SyncCoordinator::new(Arc::new(FsVault::new("notes")), Arc::new(Server), "notes")
//!     .with_store(SnapshotStore::new("notes/.selfsync/snapshot.json"))
//!     .load_snapshot()
//!     .await?;
//!
//! if let Some(report) = coordinator.trigger().await?.report() {
//!     println!("Wrote {} files", report.written.len());
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod coordinator;
pub mod delta;
pub mod fs;
pub mod phase;
pub mod reaper;
pub mod snapshot;

pub use codec::{
    build_request, pack_archive, parse_response, strip_vault_prefix, ArchiveEntry, SyncResponse,
};
pub use coordinator::{SkippedItem, SyncCoordinator, SyncOutcome, SyncReport};
pub use delta::{compute_change_set, is_eligible, ChangeSet};
pub use fs::{FsVault, VaultWatcher};
pub use phase::{PhaseCell, SyncPhase};
pub use reaper::reap;
pub use snapshot::{Snapshot, SnapshotStore};
