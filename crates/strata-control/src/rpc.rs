//! RPC method names and message types.
//!
//! Every request is JSON posted to `/rpc/{method}`; every reply is an
//! [`RpcEnvelope`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_storage::StatusSnapshot;

use crate::error::{ControlError, ControlResult, RpcError};

pub const LOGIN: &str = "Control.Login";
pub const LIST_HEAL_TARGETS: &str = "Control.ListHealTargets";
pub const HEAL_OBJECT: &str = "Control.HealObject";
pub const REPAIR_DISK_METADATA: &str = "Control.RepairDiskMetadata";
pub const SERVICE_SIGNAL: &str = "Control.ServiceSignal";
pub const TRY_INIT: &str = "Control.TryInit";

/// Requests that carry a session token.
pub trait RpcArgs {
    fn set_token(&mut self, token: &str);
}

/// Token-only request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenericArgs {
    pub token: String,
}

/// Empty reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericReply {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginArgs {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginReply {
    pub token: String,
    /// Server clock at issuance, for skew detection by the caller.
    pub timestamp: DateTime<Utc>,
    pub server_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealListArgs {
    #[serde(default)]
    pub token: String,
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub marker: String,
    #[serde(default)]
    pub delimiter: String,
    pub max_keys: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealListReply {
    pub is_truncated: bool,
    /// Only meaningful when `is_truncated` is set.
    pub next_marker: String,
    pub objects: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealObjectArgs {
    #[serde(default)]
    pub token: String,
    pub bucket: String,
    pub object: String,
}

/// Lifecycle signals understood by every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceSignal {
    /// Read-only storage status; never broadcast.
    Status,
    Restart,
    Stop,
}

impl ServiceSignal {
    /// Whether the signal changes process state and must reach every node.
    pub fn is_destructive(self) -> bool {
        matches!(self, Self::Restart | Self::Stop)
    }
}

impl fmt::Display for ServiceSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Status => "status",
            Self::Restart => "restart",
            Self::Stop => "stop",
        })
    }
}

impl FromStr for ServiceSignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(Self::Status),
            "restart" => Ok(Self::Restart),
            "stop" => Ok(Self::Stop),
            other => Err(format!("unknown service signal: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceArgs {
    #[serde(default)]
    pub token: String,
    /// Set only on the request that originates a broadcast. Every copy
    /// relayed to peers carries `false`, which stops further fan-out.
    pub remote_hop: bool,
    pub signal: ServiceSignal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReply {
    /// Present for `status` only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_info: Option<StatusSnapshot>,
}

impl RpcArgs for GenericArgs {
    fn set_token(&mut self, token: &str) {
        self.token = token.to_string();
    }
}

impl RpcArgs for HealListArgs {
    fn set_token(&mut self, token: &str) {
        self.token = token.to_string();
    }
}

impl RpcArgs for HealObjectArgs {
    fn set_token(&mut self, token: &str) {
        self.token = token.to_string();
    }
}

impl RpcArgs for ServiceArgs {
    fn set_token(&mut self, token: &str) {
        self.token = token.to_string();
    }
}

/// Uniform reply wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl<T> RpcEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: RpcError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    /// Turn a decoded envelope back into a result.
    pub fn into_result(self) -> ControlResult<T> {
        match (self.success, self.data, self.error) {
            (true, Some(data), _) => Ok(data),
            (_, _, Some(error)) => Err(error.into()),
            _ => Err(ControlError::Transport(
                "reply carried neither data nor error".to_string(),
            )),
        }
    }
}
