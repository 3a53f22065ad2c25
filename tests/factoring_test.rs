//! Factoring submission tests: preconditions, provider outcomes, and
//! resubmission after rejection.

mod common;

use common::{carrier, stranger, TestApp};
use rust_decimal::Decimal;

use freight_finance_service::error::AppError;
use freight_finance_service::models::{InvoiceStatus, SubmissionStatus};
use freight_finance_service::store::collections;

#[tokio::test]
async fn accepted_submission_computes_advance_and_links_invoice() {
    let app = TestApp::new();
    let invoice = app.create_invoice("load-1", 1000).await;

    let (updated, submission) = app
        .factoring
        .submit(invoice.invoice_id, &carrier(), "mock")
        .await
        .unwrap();

    assert_eq!(updated.status, InvoiceStatus::FactoringAccepted);
    assert_eq!(updated.factoring_provider.as_deref(), Some("mock"));
    assert_eq!(updated.factoring_submission_id, Some(submission.submission_id));

    assert_eq!(submission.status, SubmissionStatus::Accepted);
    assert_eq!(submission.advance_rate, Some(Decimal::new(9, 1)));
    // 1000 * 0.9
    assert_eq!(submission.advance_amount, Some(Decimal::from(900)));
    assert!(submission.provider_reference.is_some());
}

#[tokio::test]
async fn rejected_submission_permits_resubmission() {
    let app = TestApp::new();
    let invoice = app.create_invoice("load-2", 1000).await;

    let (updated, first) = app
        .factoring
        .submit(invoice.invoice_id, &carrier(), "strict")
        .await
        .unwrap();
    assert_eq!(updated.status, InvoiceStatus::FactoringRejected);
    assert_eq!(first.status, SubmissionStatus::Rejected);
    assert_eq!(first.rejection_reason.as_deref(), Some("credit check failed"));
    assert!(first.advance_amount.is_none());

    // A new submission id is minted and the invoice points at it.
    let (updated, second) = app
        .factoring
        .submit(invoice.invoice_id, &carrier(), "mock")
        .await
        .unwrap();
    assert_ne!(second.submission_id, first.submission_id);
    assert_eq!(updated.status, InvoiceStatus::FactoringAccepted);
    assert_eq!(updated.factoring_submission_id, Some(second.submission_id));
}

#[tokio::test]
async fn missing_pod_fails_precondition_with_no_writes() {
    let app = TestApp::new();
    app.seed_load_with("load-3", "delivered", Some(common::SHIPPER_UID), None, None)
        .await;
    let invoice = app
        .invoices
        .create(
            freight_finance_service::models::CreateInvoiceInput {
                load_id: "load-3".to_string(),
                amount_total: Decimal::from(1000),
                currency: "USD".to_string(),
                factoring_enabled: true,
                ..Default::default()
            },
            &carrier(),
        )
        .await
        .unwrap();
    assert!(!invoice.has_pod());

    let err = app
        .factoring
        .submit(invoice.invoice_id, &carrier(), "mock")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PreconditionFailed(_)));

    // No submission record written, invoice status untouched.
    let submissions: Vec<serde_json::Value> = app
        .ledger
        .scan(collections::FACTORING_SUBMISSIONS, 100)
        .await
        .unwrap();
    assert!(submissions.is_empty());
    let current = app.get_invoice(invoice.invoice_id).await;
    assert_eq!(current.status, InvoiceStatus::Issued);
    assert!(current.factoring_submission_id.is_none());
}

#[tokio::test]
async fn factoring_disabled_fails_precondition() {
    let app = TestApp::new();
    app.seed_load("load-4", "delivered").await;
    let invoice = app
        .invoices
        .create(
            freight_finance_service::models::CreateInvoiceInput {
                load_id: "load-4".to_string(),
                amount_total: Decimal::from(1000),
                currency: "USD".to_string(),
                factoring_enabled: false,
                ..Default::default()
            },
            &carrier(),
        )
        .await
        .unwrap();

    let err = app
        .factoring
        .submit(invoice.invoice_id, &carrier(), "mock")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PreconditionFailed(_)));
}

#[tokio::test]
async fn unknown_provider_is_not_found() {
    let app = TestApp::new();
    let invoice = app.create_invoice("load-5", 1000).await;

    let err = app
        .factoring
        .submit(invoice.invoice_id, &carrier(), "acme")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn only_issuer_or_admin_may_submit() {
    let app = TestApp::new();
    let invoice = app.create_invoice("load-6", 1000).await;

    let err = app
        .factoring
        .submit(invoice.invoice_id, &stranger(), "mock")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn provider_failure_is_upstream_error_and_leaves_status_unchanged() {
    let app = TestApp::new();
    let invoice = app.create_invoice("load-7", 1000).await;

    let err = app
        .factoring
        .submit(invoice.invoice_id, &carrier(), "flaky")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UpstreamError(_)));

    let current = app.get_invoice(invoice.invoice_id).await;
    assert_eq!(current.status, InvoiceStatus::Issued);
}
