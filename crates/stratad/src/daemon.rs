//! Server mode — assembles storage, control plane and background loops.
//!
//! 1. Load config and open the mirror set
//! 2. Build the lifecycle and wake channels
//! 3. Connect peer clients and build the control service
//! 4. Serve RPCs until a lifecycle signal or Ctrl-C arrives
//! 5. Drain, then exit or re-exec

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use strata_auth::TokenAuthority;
use strata_control::{AuthRpcClient, ControlService, WakeNotifier, build_router};
use strata_storage::MirrorSet;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::StrataConfig;
use crate::heal_loop;
use crate::lifecycle::{self, Exit};

/// Run the node described by the config at `config_path`.
pub async fn run_server(config_path: &Path) -> anyhow::Result<()> {
    let config = StrataConfig::from_file(config_path)?;
    info!(
        address = %config.node.address,
        peers = config.cluster.peers.len(),
        disks = config.storage.disks.len(),
        "Strata daemon starting"
    );

    // ── Storage ────────────────────────────────────────────────
    let mirror = Arc::new(MirrorSet::new(config.storage.disks.clone()));
    if mirror.load_format() {
        info!("mirror set ready");
    } else {
        warn!("mirror set not initialized; run `stratad control heal disks` to format disks");
    }

    // ── Channels ───────────────────────────────────────────────
    let (notifier, wakes) = WakeNotifier::channel(1);
    let (signal_tx, signals) = mpsc::channel(1);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Control service ────────────────────────────────────────
    let timeout = config.rpc_timeout()?;
    let max_clock_skew = config.max_clock_skew()?;
    let peers: Vec<Arc<AuthRpcClient>> = config
        .cluster
        .peers
        .iter()
        .map(|addr| {
            Arc::new(
                AuthRpcClient::new(addr.clone(), config.credentials())
                    .with_timeout(timeout)
                    .with_max_clock_skew(max_clock_skew),
            )
        })
        .collect();

    let authority = TokenAuthority::new(config.credentials(), config.token_expiry()?);
    let service = ControlService::new(authority, mirror.clone(), notifier.clone(), signal_tx)
        .with_peers(peers)
        .with_local_disks(config.storage.disks.clone());
    let router = build_router(Arc::new(service));

    // ── Background tasks ───────────────────────────────────────
    let heal_handle = tokio::spawn(heal_loop::run(mirror, wakes, shutdown_rx.clone()));
    // Initial sweep picks up damage from while the node was down.
    notifier.notify();

    let lifecycle_handle = tokio::spawn(async move {
        let exit = lifecycle::wait_for_exit(signals, lifecycle::ctrl_c()).await;
        let _ = shutdown_tx.send(true);
        exit
    });

    // ── RPC server ─────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&config.node.address)
        .await
        .with_context(|| format!("binding {}", config.node.address))?;
    info!(address = %config.node.address, "control RPC server listening");

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await?;

    let exit = lifecycle_handle.await.context("lifecycle task failed")?;
    join_background("heal loop", heal_handle).await;

    match exit {
        Exit::Restart => {
            info!("Strata daemon restarting");
            lifecycle::restart_process()
        }
        Exit::Stop | Exit::Interrupted => {
            info!("Strata daemon stopped");
            Ok(())
        }
    }
}

/// Wait for a background task during shutdown. A panic or cancellation is
/// logged, not propagated.
async fn join_background(task: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!(%task, error = %e, "background task failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clean_background_exit_joins() {
        let handle = tokio::spawn(async {});
        assert!(join_background("idle", handle).await);
    }

    #[tokio::test]
    async fn panicked_background_task_is_reported() {
        let handle = tokio::spawn(async { panic!("heal sweep blew up") });
        assert!(!join_background("heal loop", handle).await);
    }

    #[tokio::test]
    async fn aborted_background_task_is_reported() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        assert!(!join_background("heal loop", handle).await);
    }
}
