//! Error types and handling for SelfSync
//!
//! The variants follow the phases of a sync transaction. Everything up to and
//! including the network exchange and archive parsing is fatal to the
//! transaction; failures while applying the server's response are isolated to
//! the offending path.

/// Main error type for SelfSync operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A local file could not be read while building the request
    #[error("Failed to read '{path}': {message}")]
    Read {
        /// Vault-relative path of the unreadable file
        path: String,
        /// Underlying error message
        message: String,
    },

    /// The network exchange failed (connection error or non-2xx status)
    #[error("Transport error: {message}")]
    Transport {
        /// Error message describing the transport failure
        message: String,
        /// HTTP status code, when the server answered
        status: Option<u16>,
    },

    /// The response body could not be parsed as an archive
    #[error("Malformed archive: {message}")]
    MalformedArchive {
        /// Error message from the archive reader
        message: String,
    },

    /// A single write or delete failed while applying the response
    #[error("Failed to apply '{path}': {message}")]
    Apply {
        /// Vault-relative path that was skipped
        path: String,
        /// Underlying error message
        message: String,
    },

    /// A parent directory could not be created while applying the response
    #[error("Failed to create directory '{path}': {message}")]
    DirectoryCreate {
        /// Vault-relative directory path
        path: String,
        /// Underlying error message
        message: String,
    },

    /// The host could not list the vault
    #[error("Host error: {message}")]
    Host {
        /// Error message describing the host failure
        message: String,
    },

    /// The snapshot could not be loaded or persisted
    #[error("Snapshot error: {message}")]
    Snapshot {
        /// Error message describing the snapshot failure
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Local read failure
    Read,
    /// Transport failure
    Transport,
    /// Malformed response archive
    MalformedArchive,
    /// Per-item apply failure
    Apply,
    /// Per-item directory creation failure
    DirectoryCreate,
    /// Host listing failure
    Host,
    /// Snapshot persistence failure
    Snapshot,
    /// Configuration errors
    Config,
    /// I/O related errors
    Io,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read { .. } => ErrorKind::Read,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::MalformedArchive { .. } => ErrorKind::MalformedArchive,
            Self::Apply { .. } => ErrorKind::Apply,
            Self::DirectoryCreate { .. } => ErrorKind::DirectoryCreate,
            Self::Host { .. } => ErrorKind::Host,
            Self::Snapshot { .. } => ErrorKind::Snapshot,
            Self::Config { .. } => ErrorKind::Config,
            Self::Io { .. } => ErrorKind::Io,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Check whether this error aborts a whole sync transaction
    ///
    /// Apply-phase failures are logged and skipped instead.
    pub fn is_transaction_fatal(&self) -> bool {
        !matches!(self, Self::Apply { .. } | Self::DirectoryCreate { .. })
    }

    /// Create a new read error for `path`
    pub fn read<P: Into<String>, S: ToString>(path: P, cause: S) -> Self {
        Self::Read {
            path: path.into(),
            message: cause.to_string(),
        }
    }

    /// Create a new transport error without a status code
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
            status: None,
        }
    }

    /// Create a new transport error for a non-success HTTP status
    pub fn http_status(status: u16) -> Self {
        Self::Transport {
            message: format!("HTTP error! status: {}", status),
            status: Some(status),
        }
    }

    /// Create a new malformed archive error
    pub fn malformed_archive<S: ToString>(cause: S) -> Self {
        Self::MalformedArchive {
            message: cause.to_string(),
        }
    }

    /// Create a new apply error for `path`
    pub fn apply<P: Into<String>, S: ToString>(path: P, cause: S) -> Self {
        Self::Apply {
            path: path.into(),
            message: cause.to_string(),
        }
    }

    /// Create a new directory creation error for `path`
    pub fn directory_create<P: Into<String>, S: ToString>(path: P, cause: S) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            message: cause.to_string(),
        }
    }

    /// Create a new host error
    pub fn host<S: Into<String>>(message: S) -> Self {
        Self::Host {
            message: message.into(),
        }
    }

    /// Create a new snapshot error
    pub fn snapshot<S: Into<String>>(message: S) -> Self {
        Self::Snapshot {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    proptest! {
        #[test]
        fn test_error_kind_consistency(message in ".*") {
            let errors = vec![
                Error::read("a.md", message.clone()),
                Error::transport(message.clone()),
                Error::malformed_archive(message.clone()),
                Error::apply("a.md", message.clone()),
                Error::directory_create("notes", message.clone()),
                Error::host(message.clone()),
                Error::snapshot(message.clone()),
                Error::config(message.clone()),
                Error::other(message.clone()),
            ];

            for error in errors {
                let fatal = error.is_transaction_fatal();
                match error.kind() {
                    ErrorKind::Apply | ErrorKind::DirectoryCreate => prop_assert!(!fatal),
                    _ => prop_assert!(fatal),
                }
            }
        }
    }

    #[rstest]
    #[case(404)]
    #[case(500)]
    #[case(503)]
    fn test_http_status_error(#[case] status: u16) {
        let error = Error::http_status(status);
        assert_eq!(error.kind(), ErrorKind::Transport);
        assert!(error.to_string().contains(&status.to_string()));
        assert!(matches!(error, Error::Transport { status: Some(s), .. } if s == status));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "test file");
        let error = Error::from(io_error);

        assert_eq!(error.kind(), ErrorKind::Io);
        assert!(error.to_string().contains("test file"));
    }

    #[test]
    fn test_read_error_names_path() {
        let error = Error::read("notes/a.md", "permission denied");
        assert_eq!(
            error.to_string(),
            "Failed to read 'notes/a.md': permission denied"
        );
    }
}
