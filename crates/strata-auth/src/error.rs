//! Error types for credential checks and token handling.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors raised while authenticating or validating tokens.
///
/// Callers at the RPC boundary collapse all of these into one generic
/// "invalid token" condition; the variants exist for logging and tests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("access key length must be between {min} and {max} characters")]
    AccessKeyLength { min: usize, max: usize },

    #[error("secret key length must be between {min} and {max} characters")]
    SecretKeyLength { min: usize, max: usize },

    #[error("access key does not match")]
    InvalidAccessKey,

    #[error("secret key does not match")]
    InvalidSecretKey,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token signature does not verify")]
    InvalidSignature,

    #[error("token expired at {expired_at} (now {now})")]
    Expired { expired_at: i64, now: i64 },

    #[error("signing error: {0}")]
    Signing(String),
}
