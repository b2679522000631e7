//! HTTP request handlers for the logbook API.

use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Extension, State};
use logbook_store::{EntryId, LogEntry, Payload, Scope, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::guard::{Caller, ResolvedCode, read_body};
use crate::state::AppState;

/// Body of a successful append.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppendResponse {
    /// Always true.
    pub success: bool,
    /// Id of the stored entry.
    pub id: EntryId,
}

/// Body of a successful delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResponse {
    /// Always true.
    pub success: bool,
    /// Number of entries removed.
    pub deleted: usize,
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "Logging server running"
}

/// Append one entry built from the JSON object body.
pub async fn append_log(
    State(state): State<AppState>,
    caller: Caller,
    body: Body,
) -> ApiResult<Json<AppendResponse>> {
    let bytes = read_body(body, state.config().max_body_bytes).await?;
    let payload = parse_payload(&bytes)?;
    let kind = payload
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_string);
    let tenant = caller.code().map(str::to_string);

    let store = Arc::clone(state.store());
    let code = tenant.clone();
    let receipt = run_store(move || store.append(code.as_deref(), payload)).await?;

    let evicted = receipt.evicted.as_ref().map(ToString::to_string);
    info!(
        id = %receipt.id,
        code = tenant.as_deref(),
        kind = kind.as_deref(),
        evicted = evicted.as_deref(),
        "log entry appended"
    );

    Ok(Json(AppendResponse {
        success: true,
        id: receipt.id,
    }))
}

/// List entries visible to the caller.
pub async fn list_logs(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<LogEntry>>> {
    let tenant = match caller.scope() {
        Scope::All => None,
        Scope::Tenant(code) => Some(code.to_string()),
    };

    let store = Arc::clone(state.store());
    let entries = run_store(move || {
        let scope = tenant.as_deref().map_or(Scope::All, Scope::Tenant);
        Ok(store.list(scope))
    })
    .await?;

    Ok(Json(entries))
}

/// Delete every entry owned by the caller's code.
pub async fn delete_logs(
    State(state): State<AppState>,
    Extension(ResolvedCode(code)): Extension<ResolvedCode>,
) -> ApiResult<Json<DeleteResponse>> {
    let code = code.ok_or(StoreError::MissingCode)?;

    let store = Arc::clone(state.store());
    let tenant = code.as_str().to_string();
    let receipt = run_store(move || store.delete_by_tenant(&tenant)).await?;

    info!(
        code = %code,
        deleted = receipt.deleted,
        remaining = receipt.remaining,
        "log entries deleted"
    );

    Ok(Json(DeleteResponse {
        success: true,
        deleted: receipt.deleted,
    }))
}

/// Decodes an append body. An empty body is an empty object.
pub(crate) fn parse_payload(bytes: &[u8]) -> ApiResult<Payload> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Payload::new());
    }

    match serde_json::from_slice(bytes) {
        Ok(Value::Object(payload)) => Ok(payload),
        Ok(_) => Err(ApiError::InvalidRequest(
            "log entry must be a JSON object".to_string(),
        )),
        Err(e) => Err(ApiError::InvalidRequest(format!("malformed JSON: {e}"))),
    }
}

/// Runs a store call off the async runtime.
async fn run_store<T, F>(call: F) -> ApiResult<T>
where
    F: FnOnce() -> logbook_store::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?
        .map_err(ApiError::from)
}
