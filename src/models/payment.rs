//! Payment transaction records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How funds were received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Ach,
    Wire,
    Check,
    Card,
    FactoringAdvance,
    FactoringReserveRelease,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Ach => "ach",
            PaymentMethod::Wire => "wire",
            PaymentMethod::Check => "check",
            PaymentMethod::Card => "card",
            PaymentMethod::FactoringAdvance => "factoring_advance",
            PaymentMethod::FactoringReserveRelease => "factoring_reserve_release",
            PaymentMethod::Other => "other",
        }
    }
}

/// Append-only ledger entry for funds received against an invoice.
/// Created once, never mutated or deleted; the invoice's `amount_paid` is
/// recomputed transactionally rather than derived by scanning these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransactionRecord {
    pub payment_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub received_at: DateTime<Utc>,
    pub external_id: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}
