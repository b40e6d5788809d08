//! HTTP request handlers
//!
//! The scan boundary is the hot path: the handheld decoder POSTs every
//! read here and uses `rearm_ms` in the response to time its lockout.

use crate::api::server::AppContext;
use crate::error::Error;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use scantrail_common::db::models::{AssetState, ScanEvent};
use scantrail_common::events::CaptureEvent;
use scantrail_common::{ScanMode, ScanOutcome};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    payload: String,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    /// True when the debounce gate dropped the read without processing it
    suppressed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<ScanOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    audible: bool,
    /// How long the decoder should wait before accepting the next read
    rearm_ms: u64,
    mode: ScanMode,
}

#[derive(Debug, Serialize)]
pub struct ModeResponse {
    mode: ScanMode,
}

#[derive(Debug, Deserialize)]
pub struct SetModeRequest {
    mode: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    display_name: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    asset_id: String,
    projection_removed: bool,
}

type HandlerError = (StatusCode, Json<StatusResponse>);

fn error_response(e: Error) -> HandlerError {
    let status = match &e {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        Error::InvalidCategory(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(StatusResponse {
            status: e.to_string(),
        }),
    )
}

fn parse_category(query: &CategoryQuery) -> Result<Option<ScanMode>, HandlerError> {
    match query.category.as_deref() {
        None => Ok(None),
        Some(raw) => match ScanMode::from_str(raw) {
            Some(mode) => Ok(Some(mode)),
            None => Err(error_response(Error::BadRequest(format!(
                "Unknown category: {}",
                raw
            )))),
        },
    }
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "capture".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Scan Boundary
// ============================================================================

/// POST /scan - Process one decoded payload
pub async fn scan(
    State(ctx): State<AppContext>,
    Json(req): Json<ScanRequest>,
) -> Json<ScanResponse> {
    let mut pipeline = ctx.pipeline.lock().await;
    let outcome = pipeline.handle_scan(&req.payload).await;
    let rearm_ms = pipeline.rearm_delay().as_millis() as u64;
    let mode = pipeline.mode();
    drop(pipeline);

    Json(match outcome {
        Some(outcome) => ScanResponse {
            suppressed: false,
            hint: Some(outcome.hint()),
            audible: outcome.audible(),
            outcome: Some(outcome),
            rearm_ms,
            mode,
        },
        None => ScanResponse {
            suppressed: true,
            outcome: None,
            hint: None,
            audible: false,
            rearm_ms,
            mode,
        },
    })
}

// ============================================================================
// Mode Control
// ============================================================================

/// GET /mode - Current capture workflow
pub async fn get_mode(State(ctx): State<AppContext>) -> Json<ModeResponse> {
    let pipeline = ctx.pipeline.lock().await;
    Json(ModeResponse {
        mode: pipeline.mode(),
    })
}

/// POST /mode - Switch the capture workflow
pub async fn set_mode(
    State(ctx): State<AppContext>,
    Json(req): Json<SetModeRequest>,
) -> Result<Json<ModeResponse>, HandlerError> {
    let mode = ScanMode::from_str(&req.mode).ok_or_else(|| {
        error_response(Error::BadRequest(format!("Unknown mode: {}", req.mode)))
    })?;

    let mut pipeline = ctx.pipeline.lock().await;
    pipeline.set_mode(mode);

    Ok(Json(ModeResponse { mode }))
}

// ============================================================================
// Record Management
// ============================================================================

/// GET /records?category= - List scan events, newest first
pub async fn get_records(
    State(ctx): State<AppContext>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Vec<ScanEvent>>, HandlerError> {
    let category = parse_category(&query)?;

    match ctx.store.list_events(category).await {
        Ok(events) => Ok(Json(events)),
        Err(e) => {
            error!("Failed to list records: {}", e);
            Err(error_response(e))
        }
    }
}

/// DELETE /records/:event_id - Delete a scan event
///
/// Cascades the asset projection when the last single-category event for
/// the asset is removed.
pub async fn delete_record(
    State(ctx): State<AppContext>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, HandlerError> {
    match ctx.store.delete_event(event_id).await {
        Ok(deleted) => {
            info!(
                "Deleted {} record {} (asset {})",
                deleted.category, event_id, deleted.asset_id
            );
            ctx.events.emit_lossy(CaptureEvent::RecordDeleted {
                event_id,
                asset_id: deleted.asset_id.clone(),
                projection_removed: deleted.projection_removed,
                timestamp: chrono::Utc::now(),
            });
            Ok(Json(DeleteResponse {
                asset_id: deleted.asset_id,
                projection_removed: deleted.projection_removed,
            }))
        }
        Err(e) => Err(error_response(e)),
    }
}

/// PUT /records/:event_id/name - Rename a scan event
pub async fn rename_record(
    State(ctx): State<AppContext>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<RenameRequest>,
) -> Result<StatusCode, HandlerError> {
    let name = req.display_name.trim();
    if name.is_empty() {
        return Err(error_response(Error::BadRequest(
            "display_name must not be empty".to_string(),
        )));
    }

    match ctx.store.update_display_name(event_id, name).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(error_response(e)),
    }
}

/// POST /records/:event_id/photo - Attach a photo to a single-category event
pub async fn attach_photo(
    State(ctx): State<AppContext>,
    Path(event_id): Path<Uuid>,
    body: Bytes,
) -> Result<StatusCode, HandlerError> {
    if body.is_empty() {
        return Err(error_response(Error::BadRequest(
            "Photo body must not be empty".to_string(),
        )));
    }

    match ctx.store.attach_photo(event_id, &body).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(error_response(e)),
    }
}

// ============================================================================
// Projection and Export
// ============================================================================

/// GET /assets - Per-asset latest-known projection
pub async fn get_assets(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<AssetState>>, HandlerError> {
    match ctx.store.list_asset_states().await {
        Ok(assets) => Ok(Json(assets)),
        Err(e) => {
            error!("Failed to list assets: {}", e);
            Err(error_response(e))
        }
    }
}

/// GET /export?category= - Plain-text export, one row per line
pub async fn export(
    State(ctx): State<AppContext>,
    Query(query): Query<CategoryQuery>,
) -> Result<String, HandlerError> {
    let category = parse_category(&query)?;

    match ctx.store.export_rows(category).await {
        Ok(rows) => {
            let mut body = rows.join("\n");
            if !body.is_empty() {
                body.push('\n');
            }
            Ok(body)
        }
        Err(e) => Err(error_response(e)),
    }
}
