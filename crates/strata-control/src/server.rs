//! HTTP surface of the control service.
//!
//! | Method | Path | Body |
//! |---|---|---|
//! | POST | `/rpc/Control.Login` | `LoginArgs` |
//! | POST | `/rpc/Control.ListHealTargets` | `HealListArgs` |
//! | POST | `/rpc/Control.HealObject` | `HealObjectArgs` |
//! | POST | `/rpc/Control.RepairDiskMetadata` | `GenericArgs` |
//! | POST | `/rpc/Control.ServiceSignal` | `ServiceArgs` |
//! | POST | `/rpc/Control.TryInit` | `GenericArgs` |
//!
//! Every reply is an [`RpcEnvelope`]; failures carry the error's wire code.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::broadcast::PeerTransport;
use crate::error::{ControlError, ControlResult};
use crate::rpc::{self, RpcEnvelope};
use crate::service::ControlService;

/// Build the RPC router for one node.
pub fn build_router<P: PeerTransport>(service: Arc<ControlService<P>>) -> Router {
    Router::new()
        .route("/rpc/{method}", post(handle_rpc::<P>))
        .with_state(service)
}

/// POST /rpc/{method}
async fn handle_rpc<P: PeerTransport>(
    State(service): State<Arc<ControlService<P>>>,
    Path(method): Path<String>,
    body: Bytes,
) -> Response {
    match dispatch(&service, &method, &body).await {
        Ok(data) => Json(RpcEnvelope::ok(data)).into_response(),
        Err(e) => error_response(&method, &e),
    }
}

async fn dispatch<P: PeerTransport>(
    service: &ControlService<P>,
    method: &str,
    body: &[u8],
) -> ControlResult<serde_json::Value> {
    match method {
        rpc::LOGIN => encode(service.login(decode(body)?).await?),
        rpc::LIST_HEAL_TARGETS => encode(service.list_heal_targets(decode(body)?).await?),
        rpc::HEAL_OBJECT => encode(service.heal_object(decode(body)?).await?),
        rpc::REPAIR_DISK_METADATA => encode(service.repair_disk_metadata(decode(body)?).await?),
        rpc::SERVICE_SIGNAL => encode(service.service_signal(decode(body)?).await?),
        rpc::TRY_INIT => encode(service.try_init(decode(body)?).await?),
        other => Err(ControlError::UnknownMethod(other.to_string())),
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> ControlResult<T> {
    serde_json::from_slice(body).map_err(|e| ControlError::BadRequest(e.to_string()))
}

fn encode<T: Serialize>(reply: T) -> ControlResult<serde_json::Value> {
    serde_json::to_value(reply).map_err(|e| ControlError::Internal(e.to_string()))
}

fn status_for(err: &ControlError) -> StatusCode {
    match err {
        ControlError::InvalidToken => StatusCode::UNAUTHORIZED,
        ControlError::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
        ControlError::UnknownMethod(_) => StatusCode::NOT_FOUND,
        ControlError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ControlError::SignalPending { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(method: &str, err: &ControlError) -> Response {
    let status = status_for(err);
    if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
        warn!(%method, code = err.code(), error = %err, "rpc failed");
    } else {
        debug!(%method, code = err.code(), error = %err, "rpc rejected");
    }

    (
        status,
        Json(RpcEnvelope::<()>::err(err.to_rpc_error())),
    )
        .into_response()
}
