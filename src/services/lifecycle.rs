//! Invoice lifecycle engine.
//!
//! Owns the `InvoiceRecord` aggregate. Every status-changing mutation runs
//! the same primitive: fetch current, validate the transition, patch, CAS
//! write — inside one single-document transaction, so concurrent writers
//! serialize on the invoice and the loser re-validates against the winner's
//! state.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    Actor, Attachment, AttachmentKind, CreateInvoiceInput, InvoiceRecord, InvoiceStatus, Party,
    UserRole,
};
use crate::services::loads::LoadLookup;
use crate::services::metrics::INVOICE_TRANSITIONS_TOTAL;
use crate::services::state_machine::assert_transition;
use crate::store::{collections, Ledger};

/// Bounded scan size for role-scoped listings.
const LIST_SCAN_LIMIT: usize = 10_000;

/// Stamp the timestamp for a newly entered status, at most once.
fn stamp_status(invoice: &mut InvoiceRecord, target: InvoiceStatus, now: DateTime<Utc>) {
    let slot = match target {
        InvoiceStatus::Issued => &mut invoice.issued_at,
        InvoiceStatus::Sent => &mut invoice.sent_at,
        InvoiceStatus::Paid => &mut invoice.paid_at,
        InvoiceStatus::Overdue => &mut invoice.overdue_at,
        InvoiceStatus::Void => &mut invoice.voided_at,
        _ => return,
    };
    if slot.is_none() {
        *slot = Some(now);
    }
}

/// Transition an invoice to `target` inside a single-document transaction.
///
/// `mutate` runs after the status write and timestamp stamp, still inside
/// the transaction; any error it returns aborts with no partial writes.
/// Shared by the lifecycle operations, the factoring coordinator, the
/// webhook ingestor, and the overdue sweeper.
pub async fn transition_invoice<F>(
    ledger: &Ledger,
    invoice_id: &str,
    target: InvoiceStatus,
    mut mutate: F,
) -> Result<InvoiceRecord, AppError>
where
    F: FnMut(&mut InvoiceRecord) -> Result<(), AppError>,
{
    let now = Utc::now();
    let mut from = None;

    let updated = ledger
        .transact::<InvoiceRecord, _>(collections::INVOICES, invoice_id, |current| {
            let mut invoice = current.ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id))
            })?;
            assert_transition(invoice.status, target)?;
            from = Some(invoice.status);
            invoice.status = target;
            stamp_status(&mut invoice, target, now);
            mutate(&mut invoice)?;
            Ok(invoice)
        })
        .await?;

    if let Some(from) = from {
        INVOICE_TRANSITIONS_TOTAL
            .with_label_values(&[from.as_str(), target.as_str()])
            .inc();
        info!(
            invoice_id = %updated.invoice_id,
            from = from.as_str(),
            to = target.as_str(),
            "Invoice status transition"
        );
    }

    Ok(updated)
}

/// Infer a due offset in days from a load's free-form payment terms.
fn due_days_from_terms(terms: &str) -> Option<i64> {
    let terms = terms.trim().to_lowercase();
    if terms.contains("quick") {
        Some(2)
    } else if terms.starts_with('7') {
        Some(7)
    } else if terms.starts_with("15") {
        Some(15)
    } else if terms.starts_with("30") {
        Some(30)
    } else {
        None
    }
}

#[derive(Clone)]
pub struct InvoiceService {
    ledger: Ledger,
    loads: Arc<dyn LoadLookup>,
}

impl InvoiceService {
    pub fn new(ledger: Ledger, loads: Arc<dyn LoadLookup>) -> Self {
        Self { ledger, loads }
    }

    /// Create an invoice against a delivered load, written directly in
    /// `Issued` status.
    #[instrument(skip(self, input), fields(load_id = %input.load_id, issuer = %issuer.uid))]
    pub async fn create(
        &self,
        input: CreateInvoiceInput,
        issuer: &Actor,
    ) -> Result<InvoiceRecord, AppError> {
        let load = self
            .loads
            .get_load(&input.load_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Load {} not found", input.load_id))
            })?;

        if !matches!(load.status.as_str(), "delivered" | "completed") {
            return Err(AppError::PreconditionFailed(anyhow::anyhow!(
                "Load {} is not delivered (status: {})",
                load.load_id,
                load.status
            )));
        }

        let payer_uid = input
            .payer_uid
            .clone()
            .or_else(|| load.created_by.clone())
            .ok_or_else(|| {
                AppError::InvalidArgument(anyhow::anyhow!(
                    "Payer could not be determined for load {}",
                    load.load_id
                ))
            })?;
        let payer_role = input.payer_role.unwrap_or(UserRole::Shipper);

        let now = Utc::now();
        // Due date priority: explicit date > due_in_days > payment terms.
        let due_date = input
            .due_date
            .or_else(|| input.due_in_days.map(|d| now + Duration::days(d)))
            .or_else(|| {
                load.payment_terms
                    .as_deref()
                    .and_then(due_days_from_terms)
                    .map(|d| now + Duration::days(d))
            });

        let mut attachments = input.attachments;
        let has_pod = attachments.iter().any(|a| a.kind == AttachmentKind::Pod);
        if !has_pod {
            if let Some(url) = load.delivery_photo_url.clone() {
                attachments.push(Attachment {
                    kind: AttachmentKind::Pod,
                    url: Some(url),
                    document_id: None,
                });
            }
        }

        let invoice_id = Uuid::new_v4();
        let invoice_number = format!(
            "INV-{}",
            invoice_id.simple().to_string()[..8].to_uppercase()
        );

        let invoice = InvoiceRecord {
            invoice_id,
            invoice_number: invoice_number.clone(),
            load_id: load.load_id.clone(),
            issuer: Party {
                uid: issuer.uid.clone(),
                role: issuer.role,
            },
            payer: Party {
                uid: payer_uid,
                role: payer_role,
            },
            amount_total: input.amount_total,
            amount_paid: Decimal::ZERO,
            currency: input.currency,
            status: InvoiceStatus::Issued,
            due_date,
            factoring_enabled: input.factoring_enabled,
            factoring_provider: input.factoring_provider,
            factoring_submission_id: None,
            attachments,
            notes: input.notes,
            created_at: now,
            issued_at: Some(now),
            sent_at: None,
            paid_at: None,
            overdue_at: None,
            voided_at: None,
        };

        self.ledger
            .put(collections::INVOICES, &invoice_id.to_string(), &invoice)
            .await?;

        info!(
            invoice_id = %invoice_id,
            invoice_number = %invoice_number,
            load_id = %load.load_id,
            amount_total = %invoice.amount_total,
            "Invoice issued"
        );

        // Best-effort back-reference onto the load; failure never propagates
        // to the caller of the primary operation.
        if let Err(e) = self
            .loads
            .update_load(
                &load.load_id,
                json!({
                    "invoice_id": invoice_id.to_string(),
                    "invoice_number": invoice_number,
                }),
            )
            .await
        {
            warn!(
                load_id = %load.load_id,
                invoice_id = %invoice_id,
                error = %e,
                "Failed to back-reference invoice onto load"
            );
        }

        Ok(invoice)
    }

    /// Send an issued invoice to its payer.
    #[instrument(skip(self), fields(invoice_id = %invoice_id, actor = %actor.uid))]
    pub async fn send(&self, invoice_id: Uuid, actor: &Actor) -> Result<InvoiceRecord, AppError> {
        let actor = actor.clone();
        transition_invoice(
            &self.ledger,
            &invoice_id.to_string(),
            InvoiceStatus::Sent,
            |invoice| authorize_issuer(invoice, &actor),
        )
        .await
    }

    /// Void an invoice (issuer or admin only).
    #[instrument(skip(self), fields(invoice_id = %invoice_id, actor = %actor.uid))]
    pub async fn void(&self, invoice_id: Uuid, actor: &Actor) -> Result<InvoiceRecord, AppError> {
        let actor = actor.clone();
        transition_invoice(
            &self.ledger,
            &invoice_id.to_string(),
            InvoiceStatus::Void,
            |invoice| authorize_issuer(invoice, &actor),
        )
        .await
    }

    /// Read one invoice, scoped the same way the listing is: only the
    /// issuer, the payer, or an admin may see it.
    pub async fn get(&self, invoice_id: Uuid, actor: &Actor) -> Result<InvoiceRecord, AppError> {
        let invoice: InvoiceRecord = self
            .ledger
            .get(collections::INVOICES, &invoice_id.to_string())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id))
            })?;

        if !(actor.is_admin()
            || invoice.issuer.uid == actor.uid
            || invoice.payer.uid == actor.uid)
        {
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "Actor {} is neither issuer nor payer of invoice {}",
                actor.uid,
                invoice_id
            )));
        }

        Ok(invoice)
    }

    /// Role-scoped listing, newest first.
    ///
    /// Carriers and drivers see invoices they issued, shippers see invoices
    /// where they are payer, brokers see the union of both, admins see the
    /// unscoped page.
    #[instrument(skip(self), fields(actor = %actor.uid, role = actor.role.as_str()))]
    pub async fn list_for_actor(
        &self,
        actor: &Actor,
        limit: usize,
    ) -> Result<Vec<InvoiceRecord>, AppError> {
        let limit = limit.clamp(1, 100);
        let all: Vec<InvoiceRecord> =
            self.ledger.scan(collections::INVOICES, LIST_SCAN_LIMIT).await?;

        let mut scoped: Vec<InvoiceRecord> = all
            .into_iter()
            .filter(|inv| match actor.role {
                UserRole::Carrier | UserRole::Driver => inv.issuer.uid == actor.uid,
                UserRole::Shipper => inv.payer.uid == actor.uid,
                UserRole::Broker => inv.issuer.uid == actor.uid || inv.payer.uid == actor.uid,
                UserRole::Admin => true,
            })
            .collect();

        scoped.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        scoped.truncate(limit);
        Ok(scoped)
    }
}

/// Only the issuer or an admin may mutate an invoice they issued.
pub(crate) fn authorize_issuer(invoice: &InvoiceRecord, actor: &Actor) -> Result<(), AppError> {
    if actor.is_admin() || invoice.issuer.uid == actor.uid {
        Ok(())
    } else {
        Err(AppError::Unauthorized(anyhow::anyhow!(
            "Actor {} is not the issuer of invoice {}",
            actor.uid,
            invoice.invoice_id
        )))
    }
}
