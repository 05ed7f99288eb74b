//! Control plane error taxonomy.
//!
//! Every error has a stable wire `code`. Peers and operators decode the
//! code back into a [`ControlError`] so named conditions survive the hop.

use serde::{Deserialize, Serialize};
use strata_storage::GatewayError;
use thiserror::Error;

use crate::rpc::ServiceSignal;

/// Result type alias for control plane operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors surfaced by control handlers and the peer transport.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Bad credentials, or a missing, forged or expired token.
    #[error("invalid token")]
    InvalidToken,

    #[error("server not initialized, please try again")]
    NotInitialized,

    #[error("server versions do not match: local {local}, remote {remote}")]
    VersionMismatch { local: String, remote: String },

    #[error("server times are too far apart: skew {skew:?} exceeds {max:?}")]
    TimeSkew {
        skew: std::time::Duration,
        max: std::time::Duration,
    },

    /// The first failing peer, by peer index, of a signal broadcast.
    #[error("broadcast to peer {index} ({node}) failed: {source}")]
    Broadcast {
        index: usize,
        node: String,
        #[source]
        source: Box<ControlError>,
    },

    #[error(transparent)]
    Storage(#[from] GatewayError),

    #[error("lifecycle signal channel closed")]
    SignalChannelClosed,

    /// A different lifecycle signal is already queued locally.
    #[error("{pending} already pending, {requested} not applied")]
    SignalPending {
        pending: ServiceSignal,
        requested: ServiceSignal,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    /// An error reported by a remote node without a local counterpart.
    #[error("{message}")]
    Remote { code: String, message: String },
}

impl ControlError {
    /// Stable condition name used on the wire.
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidToken => "invalid-token",
            Self::NotInitialized => "not-initialized",
            Self::VersionMismatch { .. } => "version-mismatch",
            Self::TimeSkew { .. } => "time-skew",
            Self::Broadcast { .. } => "broadcast-failure",
            Self::Storage(_) => "storage",
            Self::SignalChannelClosed => "signal-channel-closed",
            Self::SignalPending { .. } => "signal-pending",
            Self::Transport(_) => "transport",
            Self::UnknownMethod(_) => "unknown-method",
            Self::BadRequest(_) => "bad-request",
            Self::Internal(_) => "internal",
            Self::Remote { code, .. } => code,
        }
    }

    /// Wire representation of this error.
    pub fn to_rpc_error(&self) -> RpcError {
        RpcError {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

/// Error body carried in a failed RPC reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: String,
    pub message: String,
}

impl From<RpcError> for ControlError {
    fn from(err: RpcError) -> Self {
        match err.code.as_str() {
            "invalid-token" => Self::InvalidToken,
            "not-initialized" => Self::NotInitialized,
            _ => Self::Remote {
                code: err.code,
                message: err.message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_conditions_survive_the_wire() {
        let decoded = ControlError::from(ControlError::InvalidToken.to_rpc_error());
        assert!(matches!(decoded, ControlError::InvalidToken));

        let decoded = ControlError::from(ControlError::NotInitialized.to_rpc_error());
        assert!(matches!(decoded, ControlError::NotInitialized));
    }

    #[test]
    fn other_errors_decode_as_remote_with_code() {
        let err = ControlError::Storage(GatewayError::BucketNotFound("media".to_string()));
        let wire = err.to_rpc_error();
        assert_eq!(wire.code, "storage");
        assert_eq!(wire.message, "bucket not found: media");

        let decoded = ControlError::from(wire);
        assert_eq!(decoded.code(), "storage");
        assert_eq!(decoded.to_string(), "bucket not found: media");
    }

    #[test]
    fn broadcast_error_names_peer() {
        let err = ControlError::Broadcast {
            index: 1,
            node: "10.0.0.2:9000".to_string(),
            source: Box::new(ControlError::NotInitialized),
        };
        assert_eq!(err.code(), "broadcast-failure");
        assert!(err.to_string().contains("peer 1 (10.0.0.2:9000)"));
        assert!(err.to_string().contains("not initialized"));
    }
}
