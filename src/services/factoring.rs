//! Factoring submission coordinator and provider gateway.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    Actor, FactoringSubmissionRecord, InvoiceRecord, InvoiceStatus, SubmissionStatus,
};
use crate::services::lifecycle::authorize_issuer;
use crate::services::metrics::{FACTORING_SUBMISSIONS_TOTAL, INVOICE_TRANSITIONS_TOTAL};
use crate::services::state_machine::assert_transition;
use crate::store::{collections, Ledger};

/// Default advance rate when the provider does not supply one.
fn default_advance_rate() -> Decimal {
    Decimal::new(9, 1) // 0.9
}

/// A provider's decision on a submitted invoice.
#[derive(Debug, Clone)]
pub struct ProviderDecision {
    pub accepted: bool,
    pub provider_reference: Option<String>,
    pub advance_rate: Option<Decimal>,
    pub fee_amount: Option<Decimal>,
    pub rejection_reason: Option<String>,
}

/// Third-party factoring API boundary. The one call in the engine that
/// crosses the network to an external party; implementations enforce their
/// own bounded timeout and fail closed.
#[async_trait]
pub trait FactoringProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn submit_invoice(&self, invoice: &InvoiceRecord)
        -> anyhow::Result<ProviderDecision>;
}

/// Providers selectable by name.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn FactoringProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn FactoringProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn FactoringProvider>, AppError> {
        self.providers.get(name).cloned().ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Unknown factoring provider: {}", name))
        })
    }
}

/// In-process provider that accepts every submission at a fixed advance
/// rate. Used for local development and as the default `"mock"` provider.
pub struct MockProvider {
    advance_rate: Decimal,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            advance_rate: default_advance_rate(),
        }
    }

    pub fn with_advance_rate(advance_rate: Decimal) -> Self {
        Self { advance_rate }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FactoringProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit_invoice(
        &self,
        invoice: &InvoiceRecord,
    ) -> anyhow::Result<ProviderDecision> {
        Ok(ProviderDecision {
            accepted: true,
            provider_reference: Some(format!(
                "mock-{}",
                &invoice.invoice_id.simple().to_string()[..8]
            )),
            advance_rate: Some(self.advance_rate),
            fee_amount: None,
            rejection_reason: None,
        })
    }
}

/// Drives submission of an invoice to a factoring provider and records the
/// outcome: the submission record write and the invoice status write form
/// the atomic unit; the provider decision itself is authoritative, so
/// reprocessing the same decision is idempotent.
#[derive(Clone)]
pub struct FactoringCoordinator {
    ledger: Ledger,
    providers: ProviderRegistry,
}

impl FactoringCoordinator {
    pub fn new(ledger: Ledger, providers: ProviderRegistry) -> Self {
        Self { ledger, providers }
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id, actor = %actor.uid, provider = provider_name))]
    pub async fn submit(
        &self,
        invoice_id: Uuid,
        actor: &Actor,
        provider_name: &str,
    ) -> Result<(InvoiceRecord, FactoringSubmissionRecord), AppError> {
        let invoice: InvoiceRecord = self
            .ledger
            .get(collections::INVOICES, &invoice_id.to_string())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id))
            })?;

        authorize_issuer(&invoice, actor)?;

        if !invoice.factoring_enabled {
            return Err(AppError::PreconditionFailed(anyhow::anyhow!(
                "Factoring is not enabled on invoice {}",
                invoice_id
            )));
        }
        if !invoice.has_pod() {
            return Err(AppError::PreconditionFailed(anyhow::anyhow!(
                "Invoice {} has no POD attachment",
                invoice_id
            )));
        }

        let provider = self.providers.get(provider_name)?;

        // The only network call on the hot path. No retry here: a failure
        // leaves the invoice status untouched and surfaces as 502.
        let decision = provider.submit_invoice(&invoice).await.map_err(|e| {
            FACTORING_SUBMISSIONS_TOTAL
                .with_label_values(&[provider_name, "error"])
                .inc();
            AppError::UpstreamError(e)
        })?;

        let submission_id = Uuid::new_v4();
        let (status, advance_rate, advance_amount) = if decision.accepted {
            let rate = decision.advance_rate.unwrap_or_else(default_advance_rate);
            (
                SubmissionStatus::Accepted,
                Some(rate),
                Some(invoice.amount_total * rate),
            )
        } else {
            (SubmissionStatus::Rejected, None, None)
        };

        let submission = FactoringSubmissionRecord {
            submission_id,
            invoice_id,
            provider: provider_name.to_string(),
            status,
            provider_reference: decision.provider_reference,
            advance_rate,
            advance_amount,
            fee_amount: decision.fee_amount,
            funded_at: None,
            rejection_reason: decision.rejection_reason,
            created_at: Utc::now(),
        };

        self.ledger
            .put(
                collections::FACTORING_SUBMISSIONS,
                &submission_id.to_string(),
                &submission,
            )
            .await?;

        let target = if decision.accepted {
            InvoiceStatus::FactoringAccepted
        } else {
            InvoiceStatus::FactoringRejected
        };

        let provider_label = provider_name.to_string();
        let mut from = None;
        let updated = self
            .ledger
            .transact::<InvoiceRecord, _>(
                collections::INVOICES,
                &invoice_id.to_string(),
                |current| {
                    let mut inv = current.ok_or_else(|| {
                        AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id))
                    })?;
                    from = Some(inv.status);
                    // A resubmission after rejection hops through the
                    // submitted status; each step stays table-legal.
                    if inv.status == InvoiceStatus::FactoringRejected {
                        assert_transition(inv.status, InvoiceStatus::FactoringSubmitted)?;
                        inv.status = InvoiceStatus::FactoringSubmitted;
                    }
                    assert_transition(inv.status, target)?;
                    inv.status = target;
                    inv.factoring_provider = Some(provider_label.clone());
                    inv.factoring_submission_id = Some(submission_id);
                    Ok(inv)
                },
            )
            .await?;

        if let Some(from) = from {
            INVOICE_TRANSITIONS_TOTAL
                .with_label_values(&[from.as_str(), target.as_str()])
                .inc();
        }
        FACTORING_SUBMISSIONS_TOTAL
            .with_label_values(&[provider_name, status.as_str()])
            .inc();

        info!(
            invoice_id = %invoice_id,
            submission_id = %submission_id,
            provider = provider_name,
            outcome = status.as_str(),
            advance_amount = ?submission.advance_amount,
            "Factoring submission recorded"
        );

        Ok((updated, submission))
    }
}
