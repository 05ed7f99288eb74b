//! Signal broadcaster — one-hop fan-out of lifecycle signals.
//!
//! # Protocol
//!
//! ```text
//! operator ──remote_hop=true──▶ origin
//!                                 ├── peer 0 ◀─remote_hop=false─┐
//!                                 ├── peer 1 ◀─remote_hop=false─┤ concurrent, full join
//!                                 └── peer N ◀─remote_hop=false─┘
//!                                 scan slots 0..N, first error wins
//!                                 no error → apply locally
//! ```
//!
//! A node receiving `remote_hop = false` applies the signal locally and
//! never fans out again, which bounds every broadcast to one hop in a
//! full mesh.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use strata_storage::StorageGateway;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dispatch::run_blocking;
use crate::error::{ControlError, ControlResult};
use crate::rpc::{self, RpcArgs, ServiceArgs, ServiceReply, ServiceSignal};

/// RPC transport to a single peer node.
pub trait PeerTransport: Send + Sync + 'static {
    /// Address of the peer, for logs and error reports.
    fn node(&self) -> &str;

    /// Invoke `method` on the peer. Timeouts are the transport's concern.
    fn call<A, R>(&self, method: &'static str, args: A) -> impl Future<Output = ControlResult<R>> + Send
    where
        A: RpcArgs + Serialize + Send + 'static,
        R: DeserializeOwned + Send + 'static;
}

/// Fans lifecycle signals out to peers and applies them locally.
pub struct SignalBroadcaster<P> {
    peers: Vec<Arc<P>>,
    gateway: Arc<dyn StorageGateway>,
    signals: mpsc::Sender<ServiceSignal>,
    /// Most recent signal accepted by the channel. While the channel is
    /// full this is the signal still waiting for the lifecycle loop.
    last_queued: Mutex<Option<ServiceSignal>>,
}

impl<P: PeerTransport> SignalBroadcaster<P> {
    pub fn new(gateway: Arc<dyn StorageGateway>, signals: mpsc::Sender<ServiceSignal>) -> Self {
        Self {
            peers: Vec::new(),
            gateway,
            signals,
            last_queued: Mutex::new(None),
        }
    }

    /// Set the peer nodes a broadcast reaches, in index order.
    pub fn with_peers(mut self, peers: Vec<Arc<P>>) -> Self {
        self.peers = peers;
        self
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Handle a service signal request.
    pub async fn handle(&self, args: ServiceArgs) -> ControlResult<ServiceReply> {
        match args.signal {
            ServiceSignal::Status => {
                let snapshot = run_blocking(&self.gateway, |gateway| Ok(gateway.storage_status())).await?;
                Ok(ServiceReply {
                    storage_info: Some(snapshot),
                })
            }
            signal @ (ServiceSignal::Restart | ServiceSignal::Stop) => {
                if args.remote_hop {
                    self.broadcast(&args).await?;
                }
                self.apply_locally(signal)?;
                Ok(ServiceReply::default())
            }
        }
    }

    /// Relay `args` to every peer and return the first failure by peer index.
    async fn broadcast(&self, args: &ServiceArgs) -> ControlResult<()> {
        let relayed = ServiceArgs {
            remote_hop: false,
            ..args.clone()
        };

        info!(signal = %args.signal, peers = self.peers.len(), "broadcasting service signal");

        // Spawned tasks outlive the caller: peer calls are never cancelled
        // once started.
        let handles: Vec<JoinHandle<ControlResult<ServiceReply>>> = self
            .peers
            .iter()
            .map(|peer| {
                let peer = Arc::clone(peer);
                let args = relayed.clone();
                tokio::spawn(async move { peer.call(rpc::SERVICE_SIGNAL, args).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(
                handle
                    .await
                    .unwrap_or_else(|e| Err(ControlError::Internal(format!("peer task failed: {e}")))),
            );
        }

        let mut first_error = None;
        for (index, (peer, result)) in self.peers.iter().zip(results).enumerate() {
            match result {
                Ok(_) => debug!(index, node = %peer.node(), signal = %args.signal, "peer accepted signal"),
                Err(e) => {
                    warn!(
                        index,
                        node = %peer.node(),
                        signal = %args.signal,
                        error = %e,
                        "unable to deliver service signal to peer"
                    );
                    if first_error.is_none() {
                        first_error = Some(ControlError::Broadcast {
                            index,
                            node: peer.node().to_string(),
                            source: Box::new(e),
                        });
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn apply_locally(&self, signal: ServiceSignal) -> ControlResult<()> {
        let mut last_queued = self.last_queued.lock().unwrap_or_else(PoisonError::into_inner);
        match self.signals.try_send(signal) {
            Ok(()) => {
                *last_queued = Some(signal);
                info!(%signal, "service signal queued for local lifecycle");
                Ok(())
            }
            Err(TrySendError::Full(_)) => match *last_queued {
                Some(pending) if pending != signal => {
                    warn!(%pending, requested = %signal, "conflicting lifecycle signal already pending");
                    Err(ControlError::SignalPending {
                        pending,
                        requested: signal,
                    })
                }
                _ => {
                    warn!(%signal, "same lifecycle signal already pending, coalescing");
                    Ok(())
                }
            },
            Err(TrySendError::Closed(_)) => Err(ControlError::SignalChannelClosed),
        }
    }
}
