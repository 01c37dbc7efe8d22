//! HTTP transport for SelfSync
//!
//! This crate sends one sync request as a `multipart/form-data` POST with a
//! bearer token, and hands back the raw archive body together with the
//! `Deleted-Files` header.
//!
//! # Examples
//!
//! ```rust,no_run
//! use selfsync_network::{ClientConfig, HttpTransport};
//! use selfsync_types::{SyncRequest, SyncTransport, UploadBlob};
//! use std::collections::BTreeSet;
//!
//! # async fn example() -> selfsync_types::Result<()> {
//! let transport = HttpTransport::new(ClientConfig::new(
//!     "http://localhost:8000/api/sync",
//!     "XYZ-123-ABC",
//! ))?;
//!
//! let request = SyncRequest {
//!     files_to_upload: vec![UploadBlob::placeholder()],
//!     all_client_paths: BTreeSet::new(),
//!     deleted_client_paths: BTreeSet::new(),
//!     last_sync_timestamp: 0.0,
//! };
//! let reply = transport.exchange(&request).await?;
//! println!("Received {} archive bytes", reply.body.len());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod protocol;

pub use client::{ClientConfig, HttpTransport};
pub use protocol::{build_form, DELETED_FILES_HEADER};
