//! The storage gateway contract consumed by the control layer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::GatewayResult;

/// Upper bound on entries returned by one heal listing page.
pub const MAX_LIST_KEYS: usize = 1000;

/// One entry of a heal listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object name relative to the bucket, or a rolled-up common prefix.
    pub name: String,
    /// Size of the object in bytes (0 for common prefixes).
    pub size: u64,
    /// True when `name` is a common prefix produced by a delimiter.
    pub is_prefix: bool,
}

/// A page of objects that need healing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResult {
    pub is_truncated: bool,
    /// Cursor for the next page; only meaningful when `is_truncated`.
    pub next_marker: String,
    pub objects: Vec<ObjectInfo>,
}

/// Point-in-time view of the storage backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub backend: String,
    pub total_disks: usize,
    pub online_disks: usize,
    pub offline_disks: usize,
    pub read_quorum: usize,
    pub write_quorum: usize,
    pub used_bytes: u64,
}

/// Storage operations the control plane delegates to.
///
/// Implementations are shared across concurrent handlers and must be
/// `Send + Sync`. Calls may block on disk I/O; async callers should run
/// them on the blocking pool.
pub trait StorageGateway: Send + Sync {
    /// Whether the backend finished initializing and can serve requests.
    fn is_ready(&self) -> bool;

    /// List objects under `bucket` that need healing.
    ///
    /// Entries are returned in lexical order, strictly after `marker`.
    fn list_objects_for_heal(
        &self,
        bucket: &str,
        prefix: &str,
        marker: &str,
        delimiter: &str,
        max_keys: usize,
    ) -> GatewayResult<ListResult>;

    /// Repair a single object on every disk that lacks a good copy.
    fn heal_object(&self, bucket: &str, object: &str) -> GatewayResult<()>;

    /// Current storage status.
    fn storage_status(&self) -> StatusSnapshot;

    /// Rewrite missing or foreign format metadata on the given disks.
    fn repair_disk_metadata(&self, disks: &[PathBuf]) -> GatewayResult<()>;
}
