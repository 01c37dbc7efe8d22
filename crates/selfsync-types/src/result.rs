//! Result type alias for SelfSync operations

/// Result type alias for SelfSync operations
pub type Result<T> = std::result::Result<T, crate::Error>;
