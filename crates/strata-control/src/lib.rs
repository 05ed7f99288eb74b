//! strata-control — the authenticated control plane of a Strata node.
//!
//! Operators and peer nodes drive healing and lifecycle through a small
//! set of RPCs served over HTTP:
//!
//! - **Login** exchanges the cluster credentials for a session token.
//! - **ListHealTargets / HealObject** page through and repair objects via
//!   the node's [`StorageGateway`](strata_storage::StorageGateway).
//! - **RepairDiskMetadata** rewrites disk formats and wakes the heal loop.
//! - **ServiceSignal** reports status, or fans `restart` / `stop` out to
//!   every peer (one hop) before applying it locally.
//! - **TryInit** wakes the heal loop.
//!
//! [`ControlService`] holds the handlers, [`server::build_router`] exposes
//! them, and [`AuthRpcClient`] is the matching client used both by the
//! operator CLI and for node-to-node calls.

pub mod broadcast;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod notify;
pub mod rpc;
pub mod server;
pub mod service;

#[cfg(test)]
mod test_support;

pub use broadcast::{PeerTransport, SignalBroadcaster};
pub use client::AuthRpcClient;
pub use dispatch::HealDispatcher;
pub use error::{ControlError, ControlResult, RpcError};
pub use notify::WakeNotifier;
pub use rpc::ServiceSignal;
pub use server::build_router;
pub use service::{ControlService, VERSION};
