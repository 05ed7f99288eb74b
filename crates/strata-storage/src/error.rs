//! Error types for storage gateway operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors reported by a storage gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("storage is not ready: write quorum of formatted disks not reached")]
    NotReady,

    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    #[error("object not found: {bucket}/{object}")]
    ObjectNotFound { bucket: String, object: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("disk is not part of this set: {}", .0.display())]
    UnknownDisk(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("format error: {0}")]
    Format(String),
}

impl GatewayError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
