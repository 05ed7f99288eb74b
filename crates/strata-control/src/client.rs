//! Authenticated RPC client for talking to one remote node.
//!
//! The client logs in lazily on the first call and caches the session
//! token. Login is where peers are vetted: a peer reporting a different
//! software version, or a clock too far from ours, is refused before any
//! privileged call is made. A call rejected with `invalid-token` (for
//! example after the token expired) triggers one re-login and one retry.

use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde::de::DeserializeOwned;
use strata_auth::Credentials;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::broadcast::PeerTransport;
use crate::error::{ControlError, ControlResult};
use crate::rpc::{self, LoginArgs, LoginReply, RpcArgs, RpcEnvelope};
use crate::service::VERSION;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_CLOCK_SKEW: Duration = Duration::from_secs(3);

/// RPC client bound to a single remote node address.
pub struct AuthRpcClient {
    addr: String,
    credentials: Credentials,
    timeout: Duration,
    max_clock_skew: Duration,
    version: String,
    token: Mutex<Option<String>>,
}

impl AuthRpcClient {
    /// Create a client for `addr` (`host:port`). No connection is made
    /// until the first call.
    pub fn new(addr: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            addr: addr.into(),
            credentials,
            timeout: DEFAULT_TIMEOUT,
            max_clock_skew: DEFAULT_MAX_CLOCK_SKEW,
            version: VERSION.to_string(),
            token: Mutex::new(None),
        }
    }

    /// Bound on a single request, connect to last byte.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_clock_skew(mut self, skew: Duration) -> Self {
        self.max_clock_skew = skew;
        self
    }

    /// Version expected from the remote node at login.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Log in and cache the session token.
    pub async fn login(&self) -> ControlResult<String> {
        let args = LoginArgs {
            username: self.credentials.access_key.clone(),
            password: self.credentials.secret_key.clone(),
        };
        let reply: LoginReply = self.post(rpc::LOGIN, encode(&args)?).await?;

        if reply.server_version != self.version {
            return Err(ControlError::VersionMismatch {
                local: self.version.clone(),
                remote: reply.server_version,
            });
        }

        let skew = (reply.timestamp - Utc::now())
            .abs()
            .to_std()
            .unwrap_or(Duration::MAX);
        if skew > self.max_clock_skew {
            return Err(ControlError::TimeSkew {
                skew,
                max: self.max_clock_skew,
            });
        }

        info!(node = %self.addr, version = %reply.server_version, "logged in to node");
        *self.token.lock().await = Some(reply.token.clone());
        Ok(reply.token)
    }

    /// Call `method` with a session token, logging in first if needed.
    pub async fn invoke<A, R>(&self, method: &str, mut args: A) -> ControlResult<R>
    where
        A: RpcArgs + Serialize,
        R: DeserializeOwned,
    {
        let cached = self.token.lock().await.clone();
        let token = match cached {
            Some(token) => token,
            None => self.login().await?,
        };
        args.set_token(&token);

        match self.post(method, encode(&args)?).await {
            Err(ControlError::InvalidToken) => {
                debug!(node = %self.addr, %method, "session rejected, logging in again");
                *self.token.lock().await = None;
                let token = self.login().await?;
                args.set_token(&token);
                self.post(method, encode(&args)?).await
            }
            other => other,
        }
    }

    async fn post<R: DeserializeOwned>(&self, method: &str, body: Vec<u8>) -> ControlResult<R> {
        tokio::time::timeout(self.timeout, self.send(method, body))
            .await
            .map_err(|_| {
                ControlError::Transport(format!(
                    "{method} to {} timed out after {:?}",
                    self.addr, self.timeout
                ))
            })?
    }

    async fn send<R: DeserializeOwned>(&self, method: &str, body: Vec<u8>) -> ControlResult<R> {
        let transport = |what: &str, e: &dyn std::fmt::Display| {
            ControlError::Transport(format!("{what} {}: {e}", self.addr))
        };

        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| transport("connect to", &e))?;
        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| transport("handshake with", &e))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "rpc connection closed with error");
            }
        });

        let req = http::Request::builder()
            .method("POST")
            .uri(format!("/rpc/{method}"))
            .header("host", &self.addr)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| ControlError::Internal(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| transport("request to", &e))?;
        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| transport("reading reply from", &e))?
            .to_bytes();

        let envelope: RpcEnvelope<R> = serde_json::from_slice(&bytes).map_err(|e| {
            ControlError::Transport(format!(
                "undecodable reply from {} (HTTP {status}): {e}",
                self.addr
            ))
        })?;
        envelope.into_result()
    }
}

/// Serialize eagerly: in-flight futures hold owned bytes, never `&args`.
fn encode<B: Serialize>(body: &B) -> ControlResult<Vec<u8>> {
    serde_json::to_vec(body).map_err(|e| ControlError::BadRequest(e.to_string()))
}

impl PeerTransport for AuthRpcClient {
    fn node(&self) -> &str {
        &self.addr
    }

    async fn call<A, R>(&self, method: &'static str, args: A) -> ControlResult<R>
    where
        A: RpcArgs + Serialize + Send + 'static,
        R: DeserializeOwned + Send + 'static,
    {
        self.invoke(method, args).await
    }
}
