//! Webhook event records: the idempotency ledger for provider callbacks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One inbound provider event, keyed by `(provider, event_id)`.
///
/// The base record is written before any side effect is attempted, so a
/// crash after the write still dedupes correctly when the provider
/// redelivers. `processed_at` is the at-most-once marker: once set, replays
/// short-circuit and return the stored record unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEventRecord {
    pub provider: String,
    pub event_id: String,
    pub event_type: String,
    pub occurred_at: Option<DateTime<Utc>>,
    pub invoice_id: Option<Uuid>,
    pub submission_id: Option<Uuid>,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    /// Side-effect failure captured without blocking acknowledgement of
    /// receipt; reconciled by operators out-of-band.
    pub processing_error: Option<String>,
}

impl WebhookEventRecord {
    /// Document key for the dedupe ledger.
    pub fn doc_id(provider: &str, event_id: &str) -> String {
        format!("{}:{}", provider, event_id)
    }
}
