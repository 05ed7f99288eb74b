//! strata-storage — the storage side of the Strata control plane.
//!
//! The control layer never touches disks itself. It talks to a
//! [`StorageGateway`], which lists objects that need healing, heals single
//! objects, reports a status snapshot and repairs per-disk metadata.
//!
//! [`MirrorSet`] is the gateway shipped with the daemon: a set of local
//! directories that each hold a full replica of every bucket.
//!
//! # Layout
//!
//! ```text
//! <disk>/
//!   ├── .strata/format.json   { version, set_id, disk_id }
//!   └── <bucket>/<object path>
//! ```
//!
//! A disk is online when its format names the set's `set_id`. The set is
//! ready once a write quorum (`n/2 + 1`) of disks agree on that id.

pub mod error;
pub mod gateway;
pub mod mirror;

pub use error::{GatewayError, GatewayResult};
pub use gateway::{ListResult, ObjectInfo, StatusSnapshot, StorageGateway};
pub use mirror::MirrorSet;
