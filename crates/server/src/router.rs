//! Public report and chat routes.

use crate::{admin, AppState};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tally_core::chat::{self, ChatCategory, ChatMessage};
use tally_core::service::{ReportError, ReportPayload};
use tracing::error;

/// Builds the full application router (public + `/admin`).
pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/cache/refresh", post(admin::refresh_cache))
        .route("/cache/entries", get(admin::cache_entries))
        .route("/cache/clear", post(admin::clear_cache));

    Router::new()
        .route("/health", get(handle_health))
        .route("/reports/monthly-sales", get(handle_monthly_sales))
        .route("/reports/discount-trends", get(handle_discount_trends))
        .route("/reports/category-distribution", get(handle_category_distribution))
        .route(
            "/reports/small-category-distribution",
            get(handle_small_category_distribution),
        )
        .route("/reports/payment-distribution", get(handle_payment_distribution))
        .route("/reports/order-type-distribution", get(handle_order_type_distribution))
        .route("/reports/weekday-distribution", get(handle_weekday_distribution))
        .route("/reports/time-periods", get(handle_time_periods))
        .route("/reports/rankings", get(handle_rankings))
        .route("/reports/customer-spending", get(handle_customer_spending))
        .route("/reports/customer-frequency", get(handle_customer_frequency))
        .route("/chat", post(handle_chat))
        .nest("/admin", admin_routes)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    pub month: Option<String>,
    pub limit: Option<usize>,
}

/// Maps a report outcome to the dashboard response envelope.
pub fn payload_response(result: Result<ReportPayload, Arc<ReportError>>) -> Response {
    match result {
        Ok(payload) => {
            let mut body = Map::new();
            body.insert("success".to_owned(), Value::Bool(true));
            body.insert("data".to_owned(), (*payload.data).clone());
            body.insert("cached".to_owned(), Value::Bool(payload.cached));
            if let Some(timestamp) = payload.cache_timestamp {
                body.insert("cacheTimestamp".to_owned(), json!(timestamp));
            }
            if !payload.warnings.is_empty() {
                body.insert("warnings".to_owned(), json!(payload.warnings));
            }
            (StatusCode::OK, Json(Value::Object(body))).into_response()
        }
        Err(err) => error_response(&err),
    }
}

/// Maps a report error to its HTTP status and error envelope.
pub fn error_response(err: &ReportError) -> Response {
    let status = match err {
        ReportError::Source(_) => StatusCode::BAD_GATEWAY,
        ReportError::InvalidMonth(_) => StatusCode::BAD_REQUEST,
        ReportError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %err, "report request failed");
    }
    (status, Json(json!({ "success": false, "error": err.to_string() }))).into_response()
}

pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let entries = state.service.cache_entries();
    Json(json!({
        "status": "ok",
        "environment": state.config.environment,
        "cacheEntries": entries.len(),
        "chatEnabled": state.chat.is_some(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn handle_monthly_sales(State(state): State<AppState>) -> Response {
    payload_response(state.service.monthly_sales().await)
}

pub async fn handle_discount_trends(State(state): State<AppState>) -> Response {
    payload_response(state.service.discount_trends().await)
}

pub async fn handle_category_distribution(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Response {
    payload_response(state.service.category_distribution(query.month).await)
}

pub async fn handle_small_category_distribution(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Response {
    payload_response(state.service.small_category_distribution(query.month).await)
}

pub async fn handle_payment_distribution(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Response {
    payload_response(state.service.payment_distribution(query.month).await)
}

pub async fn handle_order_type_distribution(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Response {
    payload_response(state.service.order_type_distribution(query.month).await)
}

pub async fn handle_weekday_distribution(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Response {
    payload_response(state.service.weekday_distribution(query.month).await)
}

pub async fn handle_time_periods(State(state): State<AppState>) -> Response {
    payload_response(state.service.time_period_trends().await)
}

pub async fn handle_rankings(
    State(state): State<AppState>,
    Query(query): Query<RankingQuery>,
) -> Response {
    payload_response(state.service.product_rankings(query.month, query.limit).await)
}

pub async fn handle_customer_spending(
    State(state): State<AppState>,
    Query(query): Query<RankingQuery>,
) -> Response {
    payload_response(state.service.customer_spending_ranking(query.month, query.limit).await)
}

pub async fn handle_customer_frequency(
    State(state): State<AppState>,
    Query(query): Query<RankingQuery>,
) -> Response {
    payload_response(state.service.customer_frequency_ranking(query.month, query.limit).await)
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub category: String,
}

pub async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if request.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "message is required" })),
        )
            .into_response();
    }
    let Some(category) = ChatCategory::from_name(&request.category) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": format!("unknown category: {}", request.category),
            })),
        )
            .into_response();
    };
    let Some(provider) = &state.chat else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "success": false, "error": "chat provider is not configured" })),
        )
            .into_response();
    };

    let digest = match chat::build_digest(&state.service, category).await {
        Ok(digest) => digest,
        Err(err) => return error_response(&err),
    };

    let system_prompt = format!("{}\n\n{digest}", chat::SYSTEM_PROMPT);
    let messages = [ChatMessage::user(request.message)];
    match provider.complete(&system_prompt, &messages).await {
        Ok(answer) => Json(json!({
            "success": true,
            "response": answer,
            "category": category.as_str(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
        .into_response(),
        Err(err) => {
            error!(error = %err, "chat provider call failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "success": false, "error": "chat provider request failed" })),
            )
                .into_response()
        }
    }
}
