//! Control service — the authenticated handler set behind every RPC.
//!
//! Each privileged handler runs the same gate before doing anything else:
//!
//! 1. validate the session token (`invalid-token` on failure)
//! 2. for handlers that need storage, check gateway readiness
//!    (`not-initialized` on failure)
//! 3. delegate to the dispatcher, broadcaster or notifier
//!
//! Login is the only ungated handler.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use strata_auth::TokenAuthority;
use strata_storage::StorageGateway;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::broadcast::{PeerTransport, SignalBroadcaster};
use crate::dispatch::HealDispatcher;
use crate::error::{ControlError, ControlResult};
use crate::notify::WakeNotifier;
use crate::rpc::{
    GenericArgs, GenericReply, HealListArgs, HealListReply, HealObjectArgs, LoginArgs, LoginReply,
    ServiceArgs, ServiceReply, ServiceSignal,
};

/// Software version reported at login.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The control RPC handlers of one node.
pub struct ControlService<P> {
    auth: TokenAuthority,
    gateway: Arc<dyn StorageGateway>,
    dispatcher: HealDispatcher,
    broadcaster: SignalBroadcaster<P>,
    notifier: WakeNotifier,
    version: String,
}

impl<P: PeerTransport> ControlService<P> {
    /// Create a service with no peers and no local disks.
    pub fn new(
        auth: TokenAuthority,
        gateway: Arc<dyn StorageGateway>,
        notifier: WakeNotifier,
        signals: mpsc::Sender<ServiceSignal>,
    ) -> Self {
        Self {
            auth,
            dispatcher: HealDispatcher::new(Arc::clone(&gateway), notifier.clone()),
            broadcaster: SignalBroadcaster::new(Arc::clone(&gateway), signals),
            gateway,
            notifier,
            version: VERSION.to_string(),
        }
    }

    /// Set the peers reached by signal broadcasts.
    pub fn with_peers(mut self, peers: Vec<Arc<P>>) -> Self {
        self.broadcaster = self.broadcaster.with_peers(peers);
        self
    }

    /// Set the local disks covered by metadata repair.
    pub fn with_local_disks(mut self, disks: Vec<PathBuf>) -> Self {
        self.dispatcher = self.dispatcher.with_disks(disks);
        self
    }

    /// Override the version reported at login.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn peer_count(&self) -> usize {
        self.broadcaster.peer_count()
    }

    /// Authenticate and open a session.
    pub async fn login(&self, args: LoginArgs) -> ControlResult<LoginReply> {
        self.auth
            .authenticate(&args.username, &args.password)
            .map_err(|e| {
                debug!(user = %args.username, error = %e, "login rejected");
                ControlError::InvalidToken
            })?;

        let token = self.auth.issue_token(&args.username).map_err(|e| {
            debug!(user = %args.username, error = %e, "token issuance failed");
            ControlError::InvalidToken
        })?;

        info!(user = %args.username, "session established");
        Ok(LoginReply {
            token,
            timestamp: Utc::now(),
            server_version: self.version.clone(),
        })
    }

    pub async fn list_heal_targets(&self, args: HealListArgs) -> ControlResult<HealListReply> {
        self.authorize(&args.token)?;
        self.ensure_initialized()?;
        self.dispatcher.list_heal_targets(args).await
    }

    pub async fn heal_object(&self, args: HealObjectArgs) -> ControlResult<GenericReply> {
        self.authorize(&args.token)?;
        self.ensure_initialized()?;
        self.dispatcher.heal_one(args).await?;
        Ok(GenericReply {})
    }

    /// Repair disk format metadata. Does not require initialized storage,
    /// since repairing formats is how storage becomes initialized.
    pub async fn repair_disk_metadata(&self, args: GenericArgs) -> ControlResult<GenericReply> {
        self.authorize(&args.token)?;
        self.dispatcher.repair_metadata().await?;
        Ok(GenericReply {})
    }

    pub async fn service_signal(&self, args: ServiceArgs) -> ControlResult<ServiceReply> {
        self.authorize(&args.token)?;
        self.ensure_initialized()?;
        self.broadcaster.handle(args).await
    }

    /// Wake the background heal loop.
    pub async fn try_init(&self, args: GenericArgs) -> ControlResult<GenericReply> {
        self.authorize(&args.token)?;
        self.notifier.notify();
        Ok(GenericReply {})
    }

    /// Validity is re-derived from the token on every call.
    fn authorize(&self, token: &str) -> ControlResult<()> {
        if self.auth.validate(token) {
            Ok(())
        } else {
            Err(ControlError::InvalidToken)
        }
    }

    fn ensure_initialized(&self) -> ControlResult<()> {
        if self.gateway.is_ready() {
            Ok(())
        } else {
            Err(ControlError::NotInitialized)
        }
    }
}
