//! Overdue sweeper: periodic batch job flipping expired open invoices to
//! `Overdue`. Best-effort — per-document failures are logged and skipped so
//! the batch always makes forward progress.

use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::error::AppError;
use crate::models::{InvoiceRecord, InvoiceStatus};
use crate::services::lifecycle::transition_invoice;
use crate::services::metrics::SWEEP_UPDATES_TOTAL;
use crate::store::{collections, Ledger};

#[derive(Clone)]
pub struct OverdueSweeper {
    ledger: Ledger,
}

impl OverdueSweeper {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Scan up to `max_docs` invoices and transition the expired open ones
    /// to `Overdue`. Returns the number updated.
    #[instrument(skip(self))]
    pub async fn run_sweep(&self, max_docs: usize) -> Result<usize, AppError> {
        let invoices: Vec<InvoiceRecord> =
            self.ledger.scan(collections::INVOICES, max_docs).await?;
        let now = Utc::now();
        let mut updated = 0;

        for invoice in invoices {
            if !invoice.status.is_open() {
                continue;
            }
            let Some(due_date) = invoice.due_date else {
                continue;
            };
            if due_date > now {
                continue;
            }

            // The transition re-validates inside the transaction, so an
            // invoice paid mid-sweep is skipped, not clobbered.
            match transition_invoice(
                &self.ledger,
                &invoice.invoice_id.to_string(),
                InvoiceStatus::Overdue,
                |_| Ok(()),
            )
            .await
            {
                Ok(_) => {
                    updated += 1;
                    SWEEP_UPDATES_TOTAL.with_label_values(&["updated"]).inc();
                }
                Err(e) => {
                    warn!(
                        invoice_id = %invoice.invoice_id,
                        error = %e,
                        "Sweep skipped invoice"
                    );
                    SWEEP_UPDATES_TOTAL.with_label_values(&["error"]).inc();
                }
            }
        }

        info!(updated, "Overdue sweep complete");
        Ok(updated)
    }

    /// Spawn the interval-driven sweep loop. Safe to run concurrently with
    /// any in-flight invoice mutation.
    pub fn spawn(self, interval_secs: u64, batch_size: usize) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = self.run_sweep(batch_size).await {
                    error!(error = %e, "Overdue sweep failed");
                }
            }
        })
    }
}
