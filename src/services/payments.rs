//! Payment recorder.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    Actor, InvoiceRecord, InvoiceStatus, PaymentMethod, PaymentTransactionRecord,
};
use crate::services::metrics::{INVOICE_TRANSITIONS_TOTAL, PAYMENTS_TOTAL};
use crate::services::state_machine::assert_transition;
use crate::store::{collections, Ledger};

/// Input for recording a payment against an invoice.
#[derive(Debug, Clone)]
pub struct RecordPaymentInput {
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub received_at: Option<DateTime<Utc>>,
    pub external_id: Option<String>,
    pub notes: Option<String>,
}

/// Applies payments against invoices. The payment record itself is
/// append-only and never conflicts; the paid-amount recompute and status
/// write happen inside one invoice transaction so that two concurrent
/// payments cannot lose an update.
#[derive(Clone)]
pub struct PaymentRecorder {
    ledger: Ledger,
}

impl PaymentRecorder {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    #[instrument(skip(self, input), fields(invoice_id = %invoice_id, actor = %actor.uid, amount = %input.amount))]
    pub async fn record_payment(
        &self,
        invoice_id: Uuid,
        actor: &Actor,
        input: RecordPaymentInput,
    ) -> Result<(InvoiceRecord, PaymentTransactionRecord), AppError> {
        if input.amount <= Decimal::ZERO {
            return Err(AppError::InvalidArgument(anyhow::anyhow!(
                "Payment amount must be positive"
            )));
        }

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

        let now = Utc::now();
        let payment = PaymentTransactionRecord {
            payment_id: Uuid::new_v4(),
            invoice_id,
            amount: input.amount,
            currency: input.currency,
            method: input.method,
            received_at: input.received_at.unwrap_or(now),
            external_id: input.external_id,
            notes: input.notes,
            recorded_by: actor.uid.clone(),
            created_at: now,
        };

        self.ledger
            .put(
                collections::PAYMENTS,
                &payment.payment_id.to_string(),
                &payment,
            )
            .await?;

        let amount = input.amount;
        let mut from = None;
        let mut target = InvoiceStatus::PartiallyPaid;
        let updated = self
            .ledger
            .transact::<InvoiceRecord, _>(
                collections::INVOICES,
                &invoice_id.to_string(),
                |current| {
                    let mut inv = current.ok_or_else(|| {
                        AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id))
                    })?;

                    // Recompute from the state read inside the transaction;
                    // a lost race re-reads the winner's amount_paid.
                    let new_paid = inv.amount_paid + amount;
                    target = if new_paid >= inv.amount_total {
                        InvoiceStatus::Paid
                    } else {
                        InvoiceStatus::PartiallyPaid
                    };
                    assert_transition(inv.status, target)?;

                    from = Some(inv.status);
                    inv.status = target;
                    inv.amount_paid = new_paid;
                    if target == InvoiceStatus::Paid && inv.paid_at.is_none() {
                        inv.paid_at = Some(now);
                    }
                    Ok(inv)
                },
            )
            .await?;

        if let Some(from) = from {
            INVOICE_TRANSITIONS_TOTAL
                .with_label_values(&[from.as_str(), target.as_str()])
                .inc();
        }
        PAYMENTS_TOTAL
            .with_label_values(&[payment.method.as_str()])
            .inc();

        info!(
            invoice_id = %invoice_id,
            payment_id = %payment.payment_id,
            amount = %payment.amount,
            method = payment.method.as_str(),
            status = updated.status.as_str(),
            amount_paid = %updated.amount_paid,
            "Payment recorded"
        );

        Ok((updated, payment))
    }
}
