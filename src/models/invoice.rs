//! Invoice aggregate for the freight finance service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actor::UserRole;

/// Invoice status.
///
/// `Draft` exists for a future draft workflow but is never produced by the
/// creation path today; invoices are written directly in `Issued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Sent,
    FactoringSubmitted,
    FactoringAccepted,
    FactoringRejected,
    PartiallyPaid,
    Paid,
    Overdue,
    Void,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::FactoringSubmitted => "factoring_submitted",
            InvoiceStatus::FactoringAccepted => "factoring_accepted",
            InvoiceStatus::FactoringRejected => "factoring_rejected",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Void => "void",
        }
    }

    /// Terminal states permit no further financial mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Void)
    }

    /// Open-ended statuses the overdue sweeper considers.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent
                | InvoiceStatus::Issued
                | InvoiceStatus::PartiallyPaid
                | InvoiceStatus::FactoringSubmitted
                | InvoiceStatus::FactoringAccepted
        )
    }
}

/// Supporting document kind attached to an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    /// Proof of delivery; the minimum document bar for factoring.
    Pod,
    RateConfirmation,
    BillOfLading,
    Other,
}

/// Supporting document reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

/// A party to the invoice (issuer or payer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub uid: String,
    pub role: UserRole,
}

/// Invoice document. The aggregate root of the finance subsystem; every
/// status change goes through the state machine and a single-document
/// transaction. Never physically deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub invoice_id: Uuid,
    /// Human-facing number, cosmetic only.
    pub invoice_number: String,
    pub load_id: String,
    pub issuer: Party,
    pub payer: Party,
    pub amount_total: Decimal,
    pub amount_paid: Decimal,
    pub currency: String,
    pub status: InvoiceStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub factoring_enabled: bool,
    pub factoring_provider: Option<String>,
    pub factoring_submission_id: Option<Uuid>,
    pub attachments: Vec<Attachment>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    // Each stamped at most once, when the status is first entered.
    pub issued_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub overdue_at: Option<DateTime<Utc>>,
    pub voided_at: Option<DateTime<Utc>>,
}

impl InvoiceRecord {
    pub fn has_pod(&self) -> bool {
        self.attachments
            .iter()
            .any(|a| a.kind == AttachmentKind::Pod)
    }
}

/// Input for creating an invoice against a delivered load.
#[derive(Debug, Clone, Default)]
pub struct CreateInvoiceInput {
    pub load_id: String,
    pub amount_total: Decimal,
    pub currency: String,
    pub due_date: Option<DateTime<Utc>>,
    pub due_in_days: Option<i64>,
    pub payer_uid: Option<String>,
    pub payer_role: Option<UserRole>,
    pub factoring_enabled: bool,
    pub factoring_provider: Option<String>,
    pub attachments: Vec<Attachment>,
    pub notes: Option<String>,
}
