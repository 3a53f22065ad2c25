//! Webhook ingestor: the idempotency boundary for provider callbacks.
//!
//! Events are deduplicated by `(provider, event_id)`. The base record is
//! written before any side effect, and effect failures are captured into
//! `processing_error` rather than surfaced — the provider's redelivery
//! mechanism must always see acknowledgement. Replays that race past the
//! fast path are still safe: re-applying the same status transition is
//! rejected by the state machine and the rejection is swallowed here.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    FactoringSubmissionRecord, InvoiceStatus, SubmissionStatus, WebhookEventRecord,
};
use crate::services::lifecycle::transition_invoice;
use crate::services::metrics::WEBHOOK_EVENTS_TOTAL;
use crate::store::{collections, Ledger};

/// Provider used when the callback path does not name one.
const DEFAULT_PROVIDER: &str = "mock";

/// Inbound provider event, already parsed by the HTTP layer.
#[derive(Debug, Clone)]
pub struct ProcessEventInput {
    pub event_id: String,
    pub event_type: String,
    pub occurred_at: Option<DateTime<Utc>>,
    pub invoice_id: Option<Uuid>,
    pub submission_id: Option<Uuid>,
    pub payload: Value,
}

#[derive(Clone)]
pub struct WebhookIngestor {
    ledger: Ledger,
}

impl WebhookIngestor {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Process one provider event with at-most-once effect application.
    /// Safe to call arbitrarily many times with the same
    /// `(provider, event_id)`.
    #[instrument(skip(self, input), fields(provider = provider, event_id = %input.event_id, event_type = %input.event_type))]
    pub async fn process_event(
        &self,
        provider: &str,
        input: ProcessEventInput,
    ) -> Result<WebhookEventRecord, AppError> {
        let provider = if provider.trim().is_empty() {
            DEFAULT_PROVIDER
        } else {
            provider
        };
        if input.event_id.trim().is_empty() {
            return Err(AppError::InvalidArgument(anyhow::anyhow!(
                "Webhook event is missing event_id"
            )));
        }

        let doc_id = WebhookEventRecord::doc_id(provider, &input.event_id);

        // Dedupe fast path: a processed record short-circuits before any
        // side effect is attempted.
        if let Some(existing) = self
            .ledger
            .get::<WebhookEventRecord>(collections::WEBHOOK_EVENTS, &doc_id)
            .await?
        {
            if existing.processed_at.is_some() {
                WEBHOOK_EVENTS_TOTAL
                    .with_label_values(&[existing.event_type.as_str(), "duplicate"])
                    .inc();
                info!(event_id = %input.event_id, "Duplicate webhook delivery short-circuited");
                return Ok(existing);
            }
        }

        // Base record before side effects: a crash after this point still
        // dedupes correctly once the provider retries past processing.
        let mut record = WebhookEventRecord {
            provider: provider.to_string(),
            event_id: input.event_id.clone(),
            event_type: input.event_type.clone(),
            occurred_at: input.occurred_at,
            invoice_id: input.invoice_id,
            submission_id: input.submission_id,
            payload: input.payload.clone(),
            received_at: Utc::now(),
            processed_at: None,
            processing_error: None,
        };
        self.ledger
            .put(collections::WEBHOOK_EVENTS, &doc_id, &record)
            .await?;

        let outcome = match self.apply_effects(&input).await {
            Ok(true) => "applied",
            Ok(false) => "no_effect",
            Err(e) => {
                warn!(
                    event_id = %input.event_id,
                    event_type = %input.event_type,
                    error = %e,
                    "Webhook effect failed; acknowledging anyway"
                );
                record.processing_error = Some(e.to_string());
                "error"
            }
        };

        // Marked processed regardless of effect success so the provider
        // stops redelivering; failed effects are reconciled out-of-band.
        record.processed_at = Some(Utc::now());
        self.ledger
            .put(collections::WEBHOOK_EVENTS, &doc_id, &record)
            .await?;

        WEBHOOK_EVENTS_TOTAL
            .with_label_values(&[input.event_type.as_str(), outcome])
            .inc();

        Ok(record)
    }

    /// Provider-agnostic event effects. Returns `Ok(false)` for event types
    /// this service does not recognize (accepted, recorded, no effect).
    async fn apply_effects(&self, input: &ProcessEventInput) -> Result<bool, AppError> {
        let target = match input.event_type.as_str() {
            "invoice.paid" | "paid" => InvoiceStatus::Paid,
            "factoring.accepted" | "submission.accepted" => InvoiceStatus::FactoringAccepted,
            "factoring.rejected" | "submission.rejected" => InvoiceStatus::FactoringRejected,
            _ => return Ok(false),
        };

        let invoice_id = match input.invoice_id {
            Some(id) => id,
            None => self
                .resolve_invoice_from_submission(input.submission_id)
                .await?
                .ok_or_else(|| {
                    AppError::InvalidArgument(anyhow::anyhow!(
                        "Event {} carries no invoice or submission reference",
                        input.event_id
                    ))
                })?,
        };

        // Keep the referenced submission record in step with the decision.
        if let Some(submission_id) = input.submission_id {
            let submission_status = match target {
                InvoiceStatus::FactoringAccepted => Some(SubmissionStatus::Accepted),
                InvoiceStatus::FactoringRejected => Some(SubmissionStatus::Rejected),
                _ => None,
            };
            if let Some(status) = submission_status {
                self.ledger
                    .transact::<FactoringSubmissionRecord, _>(
                        collections::FACTORING_SUBMISSIONS,
                        &submission_id.to_string(),
                        |current| {
                            let mut sub = current.ok_or_else(|| {
                                AppError::NotFound(anyhow::anyhow!(
                                    "Submission {} not found",
                                    submission_id
                                ))
                            })?;
                            sub.status = status;
                            Ok(sub)
                        },
                    )
                    .await?;
            }
        }

        transition_invoice(&self.ledger, &invoice_id.to_string(), target, |_| Ok(())).await?;
        Ok(true)
    }

    async fn resolve_invoice_from_submission(
        &self,
        submission_id: Option<Uuid>,
    ) -> Result<Option<Uuid>, AppError> {
        let Some(submission_id) = submission_id else {
            return Ok(None);
        };
        let submission: Option<FactoringSubmissionRecord> = self
            .ledger
            .get(
                collections::FACTORING_SUBMISSIONS,
                &submission_id.to_string(),
            )
            .await?;
        Ok(submission.map(|s| s.invoice_id))
    }
}
