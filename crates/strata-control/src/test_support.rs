//! In-memory doubles for the storage gateway and peer transport.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use strata_auth::{Credentials, TokenAuthority};
use strata_storage::{
    GatewayError, GatewayResult, ListResult, ObjectInfo, StatusSnapshot, StorageGateway,
};

use crate::broadcast::PeerTransport;
use crate::error::{ControlResult, RpcError};
use crate::rpc::RpcArgs;

pub fn test_authority() -> TokenAuthority {
    TokenAuthority::new(
        Credentials::new("strata-admin", "correct-horse-battery"),
        Duration::from_secs(3600),
    )
}

pub fn list_result(names: &[&str], is_truncated: bool, next_marker: &str) -> ListResult {
    ListResult {
        is_truncated,
        next_marker: next_marker.to_string(),
        objects: names
            .iter()
            .map(|name| ObjectInfo {
                name: name.to_string(),
                size: 1,
                is_prefix: false,
            })
            .collect(),
    }
}

#[derive(Default)]
struct GatewayState {
    list_result: ListResult,
    fail_heal: bool,
    fail_repair: bool,
    calls: Vec<String>,
}

/// Records every gateway call as a short string.
pub struct MockGateway {
    ready: bool,
    state: Mutex<GatewayState>,
}

impl MockGateway {
    pub fn ready() -> Self {
        Self {
            ready: true,
            state: Mutex::default(),
        }
    }

    pub fn not_ready() -> Self {
        Self {
            ready: false,
            state: Mutex::default(),
        }
    }

    pub fn set_list_result(&self, result: ListResult) {
        self.state.lock().unwrap().list_result = result;
    }

    pub fn fail_heal(&self) {
        self.state.lock().unwrap().fail_heal = true;
    }

    pub fn fail_repair(&self) {
        self.state.lock().unwrap().fail_repair = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl StorageGateway for MockGateway {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn list_objects_for_heal(
        &self,
        bucket: &str,
        _prefix: &str,
        _marker: &str,
        _delimiter: &str,
        _max_keys: usize,
    ) -> GatewayResult<ListResult> {
        self.record(format!("list {bucket}"));
        Ok(self.state.lock().unwrap().list_result.clone())
    }

    fn heal_object(&self, bucket: &str, object: &str) -> GatewayResult<()> {
        self.record(format!("heal {bucket}/{object}"));
        if self.state.lock().unwrap().fail_heal {
            return Err(GatewayError::ObjectNotFound {
                bucket: bucket.to_string(),
                object: object.to_string(),
            });
        }
        Ok(())
    }

    fn storage_status(&self) -> StatusSnapshot {
        self.record("status".to_string());
        StatusSnapshot {
            backend: "mock".to_string(),
            total_disks: 4,
            online_disks: 4,
            offline_disks: 0,
            read_quorum: 2,
            write_quorum: 3,
            used_bytes: 0,
        }
    }

    fn repair_disk_metadata(&self, disks: &[PathBuf]) -> GatewayResult<()> {
        self.record(format!("repair {}", disks.len()));
        if self.state.lock().unwrap().fail_repair {
            return Err(GatewayError::Format("repair refused".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct PeerState {
    delay: Duration,
    failure: Option<RpcError>,
    calls: Vec<(String, serde_json::Value)>,
}

/// A peer that records calls and answers with an empty object or a
/// configured error.
pub struct MockPeer {
    node: String,
    state: Mutex<PeerState>,
}

impl MockPeer {
    pub fn new(node: &str) -> Self {
        Self {
            node: node.to_string(),
            state: Mutex::default(),
        }
    }

    pub fn fail_with(&self, code: &str, message: &str) {
        self.state.lock().unwrap().failure = Some(RpcError {
            code: code.to_string(),
            message: message.to_string(),
        });
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = delay;
    }

    pub fn calls(&self) -> Vec<(String, serde_json::Value)> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl PeerTransport for MockPeer {
    fn node(&self) -> &str {
        &self.node
    }

    async fn call<A, R>(&self, method: &'static str, args: A) -> ControlResult<R>
    where
        A: RpcArgs + Serialize + Send + 'static,
        R: DeserializeOwned + Send + 'static,
    {
        let (delay, failure) = {
            let mut state = self.state.lock().unwrap();
            let value = serde_json::to_value(&args).unwrap();
            state.calls.push((method.to_string(), value));
            (state.delay, state.failure.clone())
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(error) => Err(error.into()),
            None => Ok(serde_json::from_value(serde_json::json!({})).unwrap()),
        }
    }
}
