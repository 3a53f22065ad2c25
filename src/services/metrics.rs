//! Prometheus metrics for the finance service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Invoice status transitions by (from, to).
pub static INVOICE_TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_invoice_transitions_total",
        "Total number of invoice status transitions",
        &["from", "to"]
    )
    .expect("Failed to register invoice_transitions_total")
});

/// Payments recorded by method.
pub static PAYMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_payments_total",
        "Total number of payments by method",
        &["method"]
    )
    .expect("Failed to register payments_total")
});

/// Factoring submissions by provider and outcome.
pub static FACTORING_SUBMISSIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_factoring_submissions_total",
        "Total number of factoring submissions by provider and outcome",
        &["provider", "outcome"] // accepted, rejected, error
    )
    .expect("Failed to register factoring_submissions_total")
});

/// Webhook events by type and outcome.
pub static WEBHOOK_EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_webhook_events_total",
        "Total number of webhook events by type and outcome",
        &["event_type", "outcome"] // applied, duplicate, no_effect, error
    )
    .expect("Failed to register webhook_events_total")
});

/// Invoices flipped to overdue by sweep runs.
pub static SWEEP_UPDATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_sweep_updates_total",
        "Total number of invoices marked overdue by the sweeper",
        &["outcome"] // updated, skipped, error
    )
    .expect("Failed to register sweep_updates_total")
});

/// Store transaction duration by collection.
pub static STORE_TXN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "finance_store_txn_duration_seconds",
        "Ledger store transaction duration in seconds",
        &["collection"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register store_txn_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&INVOICE_TRANSITIONS_TOTAL);
    Lazy::force(&PAYMENTS_TOTAL);
    Lazy::force(&FACTORING_SUBMISSIONS_TOTAL);
    Lazy::force(&WEBHOOK_EVENTS_TOTAL);
    Lazy::force(&SWEEP_UPDATES_TOTAL);
    Lazy::force(&STORE_TXN_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
