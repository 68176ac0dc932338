//! Unified error types for the mountscrub workspace.
//!
//! Reading the mount table is fail-open and never surfaces an error to the
//! caller; classification is fail-closed and reports
//! [`ScrubError::UnknownRootImplementation`] when the active framework
//! cannot be identified.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum ScrubError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// None of the recognized root implementation bits is set.
    #[error("could not determine root implementation (flags: {flags:#x})")]
    UnknownRootImplementation {
        /// Flag bits received from the caller.
        flags: u32,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ScrubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_root_message_shows_flags_in_hex() {
        let err = ScrubError::UnknownRootImplementation { flags: 0x3 };
        assert_eq!(
            err.to_string(),
            "could not determine root implementation (flags: 0x3)"
        );
    }

    #[test]
    fn io_message_includes_path() {
        let err = ScrubError::Io {
            path: PathBuf::from("/proc/1/mountinfo"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("I/O error at /proc/1/mountinfo"));
    }
}
