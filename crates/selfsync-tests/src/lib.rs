//! SelfSync integration testing support
//!
//! This crate provides the in-memory collaborators the end-to-end tests drive
//! the sync coordinator with:
//!
//! - [`MemoryVault`]: a [`selfsync_types::VaultHost`] with per-path failure injection
//! - [`ScriptedTransport`]: a [`selfsync_types::SyncTransport`] replaying queued replies
//! - [`RecordingStatus`]: a [`selfsync_types::StatusReporter`] that keeps every update

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Shared fixtures for sync tests
pub mod test_utils;

pub use test_utils::{Gate, MemoryVault, RecordingStatus, ScriptedTransport};
