//! Payment recording handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::AppError;
use crate::middleware::ActorContext;
use crate::models::{InvoiceRecord, PaymentMethod, PaymentTransactionRecord};
use crate::services::RecordPaymentInput;
use crate::AppState;

fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(ValidationError::new("amount_not_positive"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    #[validate(custom(function = "validate_positive_amount"))]
    pub amount: Decimal,
    #[validate(length(min = 3, max = 3))]
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_method")]
    pub method: PaymentMethod,
    pub received_at: Option<DateTime<Utc>>,
    pub external_id: Option<String>,
    pub notes: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_method() -> PaymentMethod {
    PaymentMethod::Other
}

#[derive(Debug, Serialize)]
pub struct RecordPaymentResponse {
    pub invoice: InvoiceRecord,
    pub payment: PaymentTransactionRecord,
}

pub async fn record_payment(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<RecordPaymentResponse>), AppError> {
    payload.validate()?;

    let (invoice, payment) = state
        .payments
        .record_payment(
            invoice_id,
            actor.actor(),
            RecordPaymentInput {
                amount: payload.amount,
                currency: payload.currency,
                method: payload.method,
                received_at: payload.received_at,
                external_id: payload.external_id,
                notes: payload.notes,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordPaymentResponse { invoice, payment }),
    ))
}
