//! Background heal loop.
//!
//! Sleeps until a wake event arrives (metadata repair, TryInit, startup),
//! then reloads disk formats and, if the set is ready, sweeps every
//! bucket's heal list page by page, healing each object it finds.

use std::sync::Arc;

use strata_storage::gateway::MAX_LIST_KEYS;
use strata_storage::{GatewayResult, MirrorSet, StorageGateway};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub buckets: usize,
    pub healed: usize,
    pub failed: usize,
}

/// Run until the wake channel closes or shutdown is signalled.
pub async fn run(
    mirror: Arc<MirrorSet>,
    mut wakes: mpsc::Receiver<()>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("heal loop started");
    loop {
        tokio::select! {
            event = wakes.recv() => {
                if event.is_none() {
                    break;
                }
                let mirror = Arc::clone(&mirror);
                match tokio::task::spawn_blocking(move || sweep(&mirror)).await {
                    Ok(Some(summary)) => info!(
                        buckets = summary.buckets,
                        healed = summary.healed,
                        failed = summary.failed,
                        "heal sweep finished"
                    ),
                    Ok(None) => debug!("storage not ready, heal sweep skipped"),
                    Err(e) => warn!(error = %e, "heal sweep task failed"),
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    info!("heal loop stopped");
}

/// Reload formats and heal everything that needs it.
///
/// Returns `None` when the set is not ready. Failures on single objects
/// are logged and counted; the sweep keeps going.
pub fn sweep(mirror: &MirrorSet) -> Option<SweepSummary> {
    if !mirror.load_format() {
        return None;
    }

    let buckets = match mirror.list_buckets() {
        Ok(buckets) => buckets,
        Err(e) => {
            warn!(error = %e, "unable to list buckets for heal sweep");
            return Some(SweepSummary::default());
        }
    };

    let mut summary = SweepSummary {
        buckets: buckets.len(),
        ..Default::default()
    };
    for bucket in &buckets {
        if let Err(e) = sweep_bucket(mirror, bucket, &mut summary) {
            warn!(%bucket, error = %e, "heal listing failed, skipping bucket");
        }
    }
    Some(summary)
}

fn sweep_bucket(mirror: &MirrorSet, bucket: &str, summary: &mut SweepSummary) -> GatewayResult<()> {
    let mut marker = String::new();
    loop {
        let page = mirror.list_objects_for_heal(bucket, "", &marker, "", MAX_LIST_KEYS)?;

        for object in page.objects.iter().filter(|o| !o.is_prefix) {
            match mirror.heal_object(bucket, &object.name) {
                Ok(()) => summary.healed += 1,
                Err(e) => {
                    warn!(%bucket, object = %object.name, error = %e, "heal failed");
                    summary.failed += 1;
                }
            }
        }

        if !page.is_truncated {
            return Ok(());
        }
        marker = page.next_marker;
    }
}
