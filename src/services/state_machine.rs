//! Invoice status state machine.
//!
//! Every status write in the service goes through [`assert_transition`]
//! before the mutation is committed; an illegal pair aborts the enclosing
//! transaction with no partial writes.

use crate::error::AppError;
use crate::models::InvoiceStatus;

use InvoiceStatus::*;

/// Outgoing transitions allowed from a given status. `Paid` and `Void` are
/// terminal; `Draft` is not produced by the engine and has no outgoing set.
fn allowed_from(status: InvoiceStatus) -> &'static [InvoiceStatus] {
    match status {
        Issued => &[
            Sent,
            FactoringSubmitted,
            FactoringAccepted,
            FactoringRejected,
            PartiallyPaid,
            Paid,
            Overdue,
            Void,
        ],
        Sent => &[
            FactoringSubmitted,
            FactoringAccepted,
            FactoringRejected,
            PartiallyPaid,
            Paid,
            Overdue,
            Void,
        ],
        // Overdue is reachable here so the sweeper covers invoices whose
        // factoring decision never arrived before the due date.
        FactoringSubmitted => &[FactoringAccepted, FactoringRejected, Overdue],
        FactoringAccepted => &[PartiallyPaid, Paid, Overdue],
        // A rejection permits resubmission or sending the invoice directly.
        FactoringRejected => &[Sent, FactoringSubmitted, Void],
        // PartiallyPaid -> PartiallyPaid covers each additional payment.
        PartiallyPaid => &[PartiallyPaid, Paid, Overdue],
        Overdue => &[PartiallyPaid, Paid, Void],
        Draft | Paid | Void => &[],
    }
}

/// Check that `current -> target` is a legal invoice transition.
pub fn assert_transition(
    current: InvoiceStatus,
    target: InvoiceStatus,
) -> Result<(), AppError> {
    if allowed_from(current).contains(&target) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            from: current,
            to: target,
        })
    }
}
