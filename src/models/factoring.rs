//! Factoring submission records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a single factoring submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    Accepted,
    Rejected,
    Funded,
    Cancelled,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Accepted => "accepted",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::Funded => "funded",
            SubmissionStatus::Cancelled => "cancelled",
        }
    }
}

/// One factoring submission attempt. A rejected submission does not block a
/// later resubmission; the invoice only ever points at the most recent
/// attempt via `factoring_submission_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoringSubmissionRecord {
    pub submission_id: Uuid,
    pub invoice_id: Uuid,
    pub provider: String,
    pub status: SubmissionStatus,
    pub provider_reference: Option<String>,
    pub advance_rate: Option<Decimal>,
    pub advance_amount: Option<Decimal>,
    pub fee_amount: Option<Decimal>,
    pub funded_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
