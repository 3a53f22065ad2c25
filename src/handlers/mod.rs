//! HTTP handlers for the freight finance service.

pub mod factoring;
pub mod invoices;
pub mod payments;
pub mod webhooks;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::services::metrics;

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "freight-finance-service" })),
    )
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (StatusCode::OK, metrics::get_metrics())
}
