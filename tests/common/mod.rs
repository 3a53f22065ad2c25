//! Shared test harness: wires the finance services over the in-memory
//! ledger store, with controllable factoring providers and seeded loads.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use freight_finance_service::models::{
    Actor, Attachment, AttachmentKind, CreateInvoiceInput, InvoiceRecord, InvoiceStatus,
    LoadRecord, Party, UserRole,
};
use freight_finance_service::services::{
    FactoringCoordinator, FactoringProvider, InvoiceService, LedgerLoadLookup, MockProvider,
    OverdueSweeper, PaymentRecorder, ProviderDecision, ProviderRegistry, WebhookIngestor,
};
use freight_finance_service::store::{collections, Ledger, MemoryStore};

pub const CARRIER_UID: &str = "carrier-1";
pub const SHIPPER_UID: &str = "shipper-1";

/// Provider that rejects every submission.
pub struct RejectingProvider;

#[async_trait]
impl FactoringProvider for RejectingProvider {
    fn name(&self) -> &str {
        "strict"
    }

    async fn submit_invoice(
        &self,
        _invoice: &InvoiceRecord,
    ) -> anyhow::Result<ProviderDecision> {
        Ok(ProviderDecision {
            accepted: false,
            provider_reference: None,
            advance_rate: None,
            fee_amount: None,
            rejection_reason: Some("credit check failed".to_string()),
        })
    }
}

/// Provider whose network call always fails.
pub struct FailingProvider;

#[async_trait]
impl FactoringProvider for FailingProvider {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn submit_invoice(
        &self,
        _invoice: &InvoiceRecord,
    ) -> anyhow::Result<ProviderDecision> {
        anyhow::bail!("connection reset by peer")
    }
}

pub struct TestApp {
    pub ledger: Ledger,
    pub invoices: InvoiceService,
    pub factoring: FactoringCoordinator,
    pub payments: PaymentRecorder,
    pub webhooks: WebhookIngestor,
    pub sweeper: OverdueSweeper,
}

impl TestApp {
    pub fn new() -> Self {
        let ledger = Ledger::new(Arc::new(MemoryStore::new()));
        let loads = Arc::new(LedgerLoadLookup::new(ledger.clone()));

        let mut providers = ProviderRegistry::new();
        providers.register(Arc::new(MockProvider::new()));
        providers.register(Arc::new(RejectingProvider));
        providers.register(Arc::new(FailingProvider));

        Self {
            invoices: InvoiceService::new(ledger.clone(), loads),
            factoring: FactoringCoordinator::new(ledger.clone(), providers),
            payments: PaymentRecorder::new(ledger.clone()),
            webhooks: WebhookIngestor::new(ledger.clone()),
            sweeper: OverdueSweeper::new(ledger.clone()),
            ledger,
        }
    }

    /// Seed a load document the way the dispatch subsystem would have
    /// written it.
    pub async fn seed_load(&self, load_id: &str, status: &str) {
        self.seed_load_with(load_id, status, Some(SHIPPER_UID), None, Some("https://cdn.example/pod.jpg"))
            .await;
    }

    pub async fn seed_load_with(
        &self,
        load_id: &str,
        status: &str,
        created_by: Option<&str>,
        payment_terms: Option<&str>,
        delivery_photo_url: Option<&str>,
    ) {
        let load = LoadRecord {
            load_id: load_id.to_string(),
            status: status.to_string(),
            created_by: created_by.map(String::from),
            payment_terms: payment_terms.map(String::from),
            delivery_photo_url: delivery_photo_url.map(String::from),
            invoice_id: None,
            invoice_number: None,
        };
        self.ledger
            .put(collections::LOADS, load_id, &load)
            .await
            .expect("seed load");
    }

    pub async fn get_load(&self, load_id: &str) -> LoadRecord {
        self.ledger
            .get(collections::LOADS, load_id)
            .await
            .expect("get load")
            .expect("load exists")
    }

    pub async fn get_invoice(&self, invoice_id: Uuid) -> InvoiceRecord {
        self.ledger
            .get(collections::INVOICES, &invoice_id.to_string())
            .await
            .expect("get invoice")
            .expect("invoice exists")
    }

    /// Create an invoice for a freshly seeded delivered load.
    pub async fn create_invoice(&self, load_id: &str, amount: i64) -> InvoiceRecord {
        self.seed_load(load_id, "delivered").await;
        self.invoices
            .create(
                CreateInvoiceInput {
                    load_id: load_id.to_string(),
                    amount_total: Decimal::from(amount),
                    currency: "USD".to_string(),
                    factoring_enabled: true,
                    ..Default::default()
                },
                &carrier(),
            )
            .await
            .expect("create invoice")
    }

    /// Write an invoice document directly, bypassing the engine. Used to
    /// stage statuses the public operations do not produce synchronously.
    pub async fn seed_invoice(
        &self,
        status: InvoiceStatus,
        due_date: Option<DateTime<Utc>>,
    ) -> InvoiceRecord {
        let invoice_id = Uuid::new_v4();
        let now = Utc::now();
        let invoice = InvoiceRecord {
            invoice_id,
            invoice_number: format!("INV-{}", &invoice_id.simple().to_string()[..8]),
            load_id: format!("load-{}", invoice_id),
            issuer: Party {
                uid: CARRIER_UID.to_string(),
                role: UserRole::Carrier,
            },
            payer: Party {
                uid: SHIPPER_UID.to_string(),
                role: UserRole::Shipper,
            },
            amount_total: Decimal::from(500),
            amount_paid: Decimal::ZERO,
            currency: "USD".to_string(),
            status,
            due_date,
            factoring_enabled: true,
            factoring_provider: None,
            factoring_submission_id: None,
            attachments: vec![Attachment {
                kind: AttachmentKind::Pod,
                url: Some("https://cdn.example/pod.jpg".to_string()),
                document_id: None,
            }],
            notes: None,
            created_at: now,
            issued_at: Some(now),
            sent_at: None,
            paid_at: None,
            overdue_at: None,
            voided_at: None,
        };
        self.ledger
            .put(collections::INVOICES, &invoice_id.to_string(), &invoice)
            .await
            .expect("seed invoice");
        invoice
    }
}

pub fn carrier() -> Actor {
    Actor::new(CARRIER_UID, UserRole::Carrier)
}

pub fn shipper() -> Actor {
    Actor::new(SHIPPER_UID, UserRole::Shipper)
}

pub fn admin() -> Actor {
    Actor::new("admin-1", UserRole::Admin)
}

pub fn stranger() -> Actor {
    Actor::new("stranger-1", UserRole::Carrier)
}

pub fn past_due() -> Option<DateTime<Utc>> {
    Some(Utc::now() - Duration::days(3))
}

pub fn future_due() -> Option<DateTime<Utc>> {
    Some(Utc::now() + Duration::days(3))
}
