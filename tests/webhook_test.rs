//! Webhook ingestor tests: validation, dedupe, effect application, and
//! error capture.

mod common;

use common::{carrier, shipper, TestApp};
use serde_json::json;

use freight_finance_service::error::AppError;
use freight_finance_service::models::{InvoiceStatus, SubmissionStatus};
use freight_finance_service::services::ProcessEventInput;

fn event(event_id: &str, event_type: &str) -> ProcessEventInput {
    ProcessEventInput {
        event_id: event_id.to_string(),
        event_type: event_type.to_string(),
        occurred_at: None,
        invoice_id: None,
        submission_id: None,
        payload: json!({}),
    }
}

#[tokio::test]
async fn missing_event_id_is_invalid() {
    let app = TestApp::new();
    let err = app
        .webhooks
        .process_event("mock", event("", "invoice.paid"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));
}

#[tokio::test]
async fn paid_event_transitions_invoice() {
    let app = TestApp::new();
    let invoice = app.create_invoice("load-1", 1000).await;
    app.invoices.send(invoice.invoice_id, &carrier()).await.unwrap();

    let mut evt = event("evt-1", "invoice.paid");
    evt.invoice_id = Some(invoice.invoice_id);
    let record = app.webhooks.process_event("mock", evt).await.unwrap();

    assert!(record.processed_at.is_some());
    assert!(record.processing_error.is_none());
    let current = app.get_invoice(invoice.invoice_id).await;
    assert_eq!(current.status, InvoiceStatus::Paid);
    assert!(current.paid_at.is_some());
}

#[tokio::test]
async fn duplicate_delivery_short_circuits_with_stored_record() {
    let app = TestApp::new();
    let invoice = app.create_invoice("load-2", 1000).await;

    let mut evt = event("evt-2", "invoice.paid");
    evt.invoice_id = Some(invoice.invoice_id);
    let first = app.webhooks.process_event("mock", evt.clone()).await.unwrap();
    let replay = app.webhooks.process_event("mock", evt).await.unwrap();

    // Same stored record, effect applied at most once.
    assert_eq!(first.processed_at, replay.processed_at);
    assert!(replay.processing_error.is_none());
    let current = app.get_invoice(invoice.invoice_id).await;
    assert_eq!(current.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn unrecognized_event_types_are_recorded_with_no_effect() {
    let app = TestApp::new();
    let invoice = app.create_invoice("load-3", 1000).await;

    let mut evt = event("evt-3", "reserve.released");
    evt.invoice_id = Some(invoice.invoice_id);
    let record = app.webhooks.process_event("mock", evt).await.unwrap();

    assert!(record.processed_at.is_some());
    assert!(record.processing_error.is_none());
    let current = app.get_invoice(invoice.invoice_id).await;
    assert_eq!(current.status, InvoiceStatus::Issued);
}

#[tokio::test]
async fn blank_provider_is_normalized_to_mock() {
    let app = TestApp::new();
    let record = app
        .webhooks
        .process_event("", event("evt-4", "ping"))
        .await
        .unwrap();
    assert_eq!(record.provider, "mock");
}

#[tokio::test]
async fn effect_failure_is_captured_not_surfaced() {
    let app = TestApp::new();
    let invoice = app.create_invoice("load-4", 1000).await;
    app.payments
        .record_payment(
            invoice.invoice_id,
            &shipper(),
            freight_finance_service::services::RecordPaymentInput {
                amount: rust_decimal::Decimal::from(1000),
                currency: "USD".to_string(),
                method: freight_finance_service::models::PaymentMethod::Wire,
                received_at: None,
                external_id: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    // The invoice is already Paid; a late factoring.accepted event is an
    // illegal transition, swallowed into the record.
    let mut evt = event("evt-5", "factoring.accepted");
    evt.invoice_id = Some(invoice.invoice_id);
    let record = app.webhooks.process_event("mock", evt).await.unwrap();

    assert!(record.processed_at.is_some());
    assert!(record.processing_error.is_some());
    let current = app.get_invoice(invoice.invoice_id).await;
    assert_eq!(current.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn submission_reference_resolves_invoice_and_updates_submission() {
    let app = TestApp::new();
    let invoice = app.create_invoice("load-5", 1000).await;
    let (_, submission) = app
        .factoring
        .submit(invoice.invoice_id, &carrier(), "strict")
        .await
        .unwrap();
    assert_eq!(submission.status, SubmissionStatus::Rejected);

    // Provider later reverses the decision via webhook, referencing only
    // the submission. FactoringRejected -> FactoringSubmitted is the legal
    // resubmission edge, so the accepted event cannot apply directly and
    // is captured as a processing error; the rejected replay is a no-op.
    let mut evt = event("evt-6", "factoring.rejected");
    evt.submission_id = Some(submission.submission_id);
    let record = app.webhooks.process_event("mock", evt).await.unwrap();

    assert!(record.processed_at.is_some());
    // Re-applying the same rejection is an illegal self-transition,
    // swallowed rather than surfaced.
    assert!(record.processing_error.is_some());
    let current = app.get_invoice(invoice.invoice_id).await;
    assert_eq!(current.status, InvoiceStatus::FactoringRejected);

    let stored: freight_finance_service::models::FactoringSubmissionRecord = app
        .ledger
        .get(
            freight_finance_service::store::collections::FACTORING_SUBMISSIONS,
            &submission.submission_id.to_string(),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, SubmissionStatus::Rejected);
}

#[tokio::test]
async fn submitted_invoice_accepts_factoring_decision_event() {
    let app = TestApp::new();
    let invoice = app
        .seed_invoice(InvoiceStatus::FactoringSubmitted, None)
        .await;

    let mut evt = event("evt-7", "submission.accepted");
    evt.invoice_id = Some(invoice.invoice_id);
    let record = app.webhooks.process_event("mock", evt).await.unwrap();

    assert!(record.processing_error.is_none());
    let current = app.get_invoice(invoice.invoice_id).await;
    assert_eq!(current.status, InvoiceStatus::FactoringAccepted);
}
