//! Administrative cache endpoints.
//!
//! These exist for operational visibility and the dashboard's "refresh"
//! button, not for correctness: the cache heals itself through TTL expiry
//! whether or not anyone calls them.

use crate::router::error_response;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::info;

/// POST /admin/cache/refresh
///
/// Clears all report keys and recomputes them: the core series eagerly,
/// per-month details as a failure-tolerant batch. Individual unit failures
/// are reported in the summary without failing the operation.
pub async fn refresh_cache(State(state): State<AppState>) -> Response {
    match state.service.refresh_all().await {
        Ok(summary) => {
            info!(
                units = summary.units.len(),
                failed = summary.failed_count(),
                "manual cache refresh complete"
            );
            Json(json!({
                "success": true,
                "failedUnits": summary.failed_count(),
                "units": summary.units,
                "entries": summary.entries,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }))
            .into_response()
        }
        Err(err) => error_response(&err),
    }
}

/// GET /admin/cache/entries
///
/// Lists all live (non-expired) report cache entries with creation time and
/// approximate serialized size.
pub async fn cache_entries(State(state): State<AppState>) -> impl IntoResponse {
    let entries = state.service.cache_entries();
    let total_bytes: usize = entries.iter().map(|entry| entry.approx_size_bytes).sum();
    Json(json!({
        "success": true,
        "cached": !entries.is_empty(),
        "entries": entries,
        "totalSizeBytes": total_bytes,
    }))
}

/// POST /admin/cache/clear
///
/// Drops the report cache and the parsed dataset caches. The next request
/// per key recomputes from a fresh upstream fetch.
pub async fn clear_cache(State(state): State<AppState>) -> impl IntoResponse {
    state.service.clear_all();
    info!("cache cleared via admin endpoint");
    (StatusCode::OK, Json(json!({ "success": true })))
}
