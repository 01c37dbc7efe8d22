//! Core type system and error handling for SelfSync
//!
//! This crate provides the foundational types, collaborator traits and error handling
//! shared by every SelfSync crate. It includes:
//!
//! - **Error handling**: One error enum covering the whole sync transaction taxonomy
//! - **Core types**: Vault listings, wire-level request/reply values and status values
//! - **Traits**: The capabilities the sync core needs from its host and transport
//!
//! # Examples
//!
//! ```rust
//! use selfsync_types::{ContentKind, FileRecord};
//!
//! let record = FileRecord::new("notes/today.md", 1_700_000_000_000);
//! assert_eq!(record.content_kind, ContentKind::Text);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
pub use result::Result;
pub use traits::*;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_blob() {
        let blob = UploadBlob::placeholder();
        assert!(blob.is_placeholder());
        assert!(blob.bytes.is_empty());
        assert_eq!(blob.name, UploadBlob::PLACEHOLDER_NAME);
    }

    #[test]
    fn test_apply_errors_are_not_fatal() {
        assert!(!Error::apply("a.md", "disk full").is_transaction_fatal());
        assert!(!Error::directory_create("notes", "exists").is_transaction_fatal());
        assert!(Error::transport("connection refused").is_transaction_fatal());
        assert!(Error::malformed_archive("bad header").is_transaction_fatal());
    }
}
