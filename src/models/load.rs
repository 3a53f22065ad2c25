//! Load collaborator shape.
//!
//! Loads are owned by the marketplace's dispatch subsystem; the finance
//! service only reads the fields it needs at invoice creation and writes a
//! best-effort back-reference once the invoice exists.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRecord {
    pub load_id: String,
    /// Delivery status, e.g. "delivered" or "completed".
    pub status: String,
    /// Uid of the user who created the load; the default payer.
    pub created_by: Option<String>,
    /// Free-form payment terms, e.g. "quick pay", "Net 30".
    pub payment_terms: Option<String>,
    pub delivery_photo_url: Option<String>,
    // Back-references stamped by the finance service after issuance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
}
