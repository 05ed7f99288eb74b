//! Heal dispatcher — adapts control requests onto the storage gateway.

use std::path::PathBuf;
use std::sync::Arc;

use strata_storage::{GatewayResult, StorageGateway};
use tracing::{debug, info};

use crate::error::{ControlError, ControlResult};
use crate::notify::WakeNotifier;
use crate::rpc::{HealListArgs, HealListReply, HealObjectArgs};

/// Pass-through adapter from heal RPCs to [`StorageGateway`] calls.
///
/// Results and errors are surfaced unchanged; nothing is retried,
/// re-paginated or reordered here.
pub struct HealDispatcher {
    gateway: Arc<dyn StorageGateway>,
    /// Local disks handed to metadata repair.
    disks: Vec<PathBuf>,
    notifier: WakeNotifier,
}

impl HealDispatcher {
    pub fn new(gateway: Arc<dyn StorageGateway>, notifier: WakeNotifier) -> Self {
        Self {
            gateway,
            disks: Vec::new(),
            notifier,
        }
    }

    /// Set the local disks covered by metadata repair.
    pub fn with_disks(mut self, disks: Vec<PathBuf>) -> Self {
        self.disks = disks;
        self
    }

    /// List objects that need healing.
    ///
    /// `max_keys == 0` or an empty bucket yields an empty, non-truncated
    /// reply without consulting the gateway.
    pub async fn list_heal_targets(&self, args: HealListArgs) -> ControlResult<HealListReply> {
        if args.max_keys == 0 || args.bucket.is_empty() {
            return Ok(HealListReply::default());
        }

        let result = run_blocking(&self.gateway, move |gateway| {
            gateway.list_objects_for_heal(
                &args.bucket,
                &args.prefix,
                &args.marker,
                &args.delimiter,
                args.max_keys,
            )
        })
        .await?;

        Ok(HealListReply {
            is_truncated: result.is_truncated,
            next_marker: result.next_marker,
            objects: result.objects.into_iter().map(|o| o.name).collect(),
        })
    }

    /// Heal one object. Failures are returned verbatim.
    pub async fn heal_one(&self, args: HealObjectArgs) -> ControlResult<()> {
        debug!(bucket = %args.bucket, object = %args.object, "healing object");
        run_blocking(&self.gateway, move |gateway| {
            gateway.heal_object(&args.bucket, &args.object)
        })
        .await
    }

    /// Repair format metadata on the local disks, then wake the heal loop
    /// so it picks up whatever the repair made reachable.
    pub async fn repair_metadata(&self) -> ControlResult<()> {
        let disks = self.disks.clone();
        let count = disks.len();
        run_blocking(&self.gateway, move |gateway| gateway.repair_disk_metadata(&disks)).await?;

        info!(disks = count, "disk metadata repaired, waking heal loop");
        self.notifier.notify();
        Ok(())
    }
}

/// Run a synchronous gateway call on the blocking pool.
pub(crate) async fn run_blocking<T, F>(gateway: &Arc<dyn StorageGateway>, f: F) -> ControlResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn StorageGateway) -> GatewayResult<T> + Send + 'static,
{
    let gateway = Arc::clone(gateway);
    tokio::task::spawn_blocking(move || f(gateway.as_ref()))
        .await
        .map_err(|e| ControlError::Internal(format!("storage task failed: {e}")))?
        .map_err(ControlError::from)
}
