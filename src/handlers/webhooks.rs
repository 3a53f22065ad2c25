//! Provider webhook and sweep handlers.
//!
//! Webhooks carry no actor context: the sender is the factoring provider,
//! not a marketplace user. Signature verification belongs to the gateway.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::WebhookEventRecord;
use crate::services::ProcessEventInput;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WebhookEventRequest {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub event_type: String,
    pub occurred_at: Option<DateTime<Utc>>,
    pub invoice_id: Option<Uuid>,
    pub submission_id: Option<Uuid>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

pub async fn provider_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(payload): Json<WebhookEventRequest>,
) -> Result<Json<WebhookEventRecord>, AppError> {
    let record = state
        .webhooks
        .process_event(
            &provider,
            ProcessEventInput {
                event_id: payload.event_id,
                event_type: payload.event_type,
                occurred_at: payload.occurred_at,
                invoice_id: payload.invoice_id,
                submission_id: payload.submission_id,
                payload: payload.payload,
            },
        )
        .await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct SweepParams {
    pub max_docs: Option<usize>,
}

/// Invoked by an external scheduler, not end users.
pub async fn run_overdue_sweep(
    State(state): State<AppState>,
    Query(params): Query<SweepParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let max_docs = params
        .max_docs
        .unwrap_or(state.config.sweep.batch_size)
        .clamp(1, 10_000);
    let updated = state.sweeper.run_sweep(max_docs).await?;
    Ok(Json(json!({ "updated": updated })))
}
