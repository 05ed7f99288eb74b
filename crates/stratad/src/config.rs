//! strata.toml configuration parser.
//!
//! ```toml
//! [node]
//! address = "0.0.0.0:9000"
//!
//! [cluster]
//! peers = ["10.0.0.2:9000", "10.0.0.3:9000"]
//!
//! [storage]
//! disks = ["/mnt/disk1", "/mnt/disk2"]
//!
//! [auth]
//! access_key = "strata-admin"
//! secret_key = "correct-horse-battery"
//! token_expiry = "24h"
//!
//! [rpc]
//! timeout = "10s"
//! max_clock_skew = "3s"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use strata_auth::Credentials;

pub const ACCESS_KEY_ENV: &str = "STRATA_ACCESS_KEY";
pub const SECRET_KEY_ENV: &str = "STRATA_SECRET_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrataConfig {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Listen address for the control RPC server.
    pub address: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:9000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Every other node of the cluster, `host:port`. Must not include
    /// this node.
    #[serde(default)]
    pub peers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub disks: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_token_expiry")]
    pub token_expiry: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            token_expiry: default_token_expiry(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_timeout")]
    pub timeout: String,
    #[serde(default = "default_max_clock_skew")]
    pub max_clock_skew: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout: default_rpc_timeout(),
            max_clock_skew: default_max_clock_skew(),
        }
    }
}

fn default_token_expiry() -> String {
    "24h".to_string()
}

fn default_rpc_timeout() -> String {
    "10s".to_string()
}

fn default_max_clock_skew() -> String {
    "3s".to_string()
}

impl StrataConfig {
    /// Load from `path`, apply environment overrides and validate.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Replace credentials with values found through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(access_key) = lookup(ACCESS_KEY_ENV) {
            self.auth.access_key = access_key;
        }
        if let Some(secret_key) = lookup(SECRET_KEY_ENV) {
            self.auth.secret_key = secret_key;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.storage.disks.is_empty() {
            bail!("[storage] disks must list at least one disk");
        }
        if self.auth.access_key.is_empty() || self.auth.secret_key.is_empty() {
            bail!("credentials missing: set [auth] access_key/secret_key or {ACCESS_KEY_ENV}/{SECRET_KEY_ENV}");
        }
        if self.cluster.peers.contains(&self.node.address) {
            bail!("[cluster] peers must not include this node ({})", self.node.address);
        }
        // Token claims carry signed unix seconds.
        if i64::try_from(self.token_expiry()?.as_secs()).is_err() {
            bail!("[auth] token_expiry {:?} is too long", self.auth.token_expiry);
        }
        self.rpc_timeout()?;
        self.max_clock_skew()?;
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.auth.access_key.clone(), self.auth.secret_key.clone())
    }

    pub fn token_expiry(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.auth.token_expiry).context("[auth] token_expiry")
    }

    pub fn rpc_timeout(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.rpc.timeout).context("[rpc] timeout")
    }

    pub fn max_clock_skew(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.rpc.max_clock_skew).context("[rpc] max_clock_skew")
    }
}

/// Credentials for operator commands run without a config file.
pub fn credentials_from_env(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Credentials> {
    match (lookup(ACCESS_KEY_ENV), lookup(SECRET_KEY_ENV)) {
        (Some(access_key), Some(secret_key)) => Ok(Credentials::new(access_key, secret_key)),
        _ => bail!("no credentials: pass --config or set {ACCESS_KEY_ENV} and {SECRET_KEY_ENV}"),
    }
}

/// Parse a duration string like "500ms", "10s", "5m", "24h". A bare
/// number is seconds.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let parsed = if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else if let Some(hours) = s.strip_suffix('h') {
        hours.parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    };
    parsed.with_context(|| format!("invalid duration {s:?}"))
}
