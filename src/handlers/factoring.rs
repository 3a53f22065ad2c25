//! Factoring submission handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::ActorContext;
use crate::models::{FactoringSubmissionRecord, InvoiceRecord};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitFactoringRequest {
    #[serde(default = "default_provider")]
    pub provider: String,
}

fn default_provider() -> String {
    "mock".to_string()
}

#[derive(Debug, Serialize)]
pub struct SubmitFactoringResponse {
    pub invoice: InvoiceRecord,
    pub submission: FactoringSubmissionRecord,
}

pub async fn submit_factoring(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<SubmitFactoringRequest>,
) -> Result<Json<SubmitFactoringResponse>, AppError> {
    let (invoice, submission) = state
        .factoring
        .submit(invoice_id, actor.actor(), &payload.provider)
        .await?;
    Ok(Json(SubmitFactoringResponse {
        invoice,
        submission,
    }))
}
