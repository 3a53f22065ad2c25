//! Invoice lifecycle handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::AppError;
use crate::middleware::ActorContext;
use crate::models::{Attachment, CreateInvoiceInput, InvoiceRecord, UserRole};
use crate::AppState;

fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(ValidationError::new("amount_not_positive"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1))]
    pub load_id: String,
    #[validate(custom(function = "validate_positive_amount"))]
    pub amount_total: Decimal,
    #[validate(length(min = 3, max = 3))]
    #[serde(default = "default_currency")]
    pub currency: String,
    pub due_date: Option<DateTime<Utc>>,
    pub due_in_days: Option<i64>,
    pub payer_uid: Option<String>,
    pub payer_role: Option<UserRole>,
    #[serde(default)]
    pub factoring_enabled: bool,
    pub factoring_provider: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub notes: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

pub async fn create_invoice(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceRecord>), AppError> {
    payload.validate()?;

    let input = CreateInvoiceInput {
        load_id: payload.load_id,
        amount_total: payload.amount_total,
        currency: payload.currency,
        due_date: payload.due_date,
        due_in_days: payload.due_in_days,
        payer_uid: payload.payer_uid,
        payer_role: payload.payer_role,
        factoring_enabled: payload.factoring_enabled,
        factoring_provider: payload.factoring_provider,
        attachments: payload.attachments,
        notes: payload.notes,
    };

    let invoice = state.invoices.create(input, actor.actor()).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

#[derive(Debug, Deserialize)]
pub struct ListInvoicesParams {
    pub limit: Option<usize>,
}

pub async fn list_invoices(
    State(state): State<AppState>,
    actor: ActorContext,
    Query(params): Query<ListInvoicesParams>,
) -> Result<Json<Vec<InvoiceRecord>>, AppError> {
    let invoices = state
        .invoices
        .list_for_actor(actor.actor(), params.limit.unwrap_or(50))
        .await?;
    Ok(Json(invoices))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceRecord>, AppError> {
    Ok(Json(state.invoices.get(invoice_id, actor.actor()).await?))
}

pub async fn send_invoice(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceRecord>, AppError> {
    Ok(Json(state.invoices.send(invoice_id, actor.actor()).await?))
}

pub async fn void_invoice(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceRecord>, AppError> {
    Ok(Json(state.invoices.void(invoice_id, actor.actor()).await?))
}
