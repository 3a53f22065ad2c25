pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use config::Config;
use services::{
    FactoringCoordinator, InvoiceService, LedgerLoadLookup, MockProvider, OverdueSweeper,
    PaymentRecorder, ProviderRegistry, WebhookIngestor,
};
use store::{Ledger, LedgerStore, MemoryStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ledger: Ledger,
    pub invoices: InvoiceService,
    pub factoring: FactoringCoordinator,
    pub payments: PaymentRecorder,
    pub webhooks: WebhookIngestor,
    pub sweeper: OverdueSweeper,
}

pub struct Application {
    port: u16,
    router: Router,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        // The reference in-memory store; production deployments plug a real
        // document store in behind the same trait.
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryStore::new());
        Self::build_with_store(config, store).await
    }

    pub async fn build_with_store(
        config: Config,
        store: Arc<dyn LedgerStore>,
    ) -> anyhow::Result<Self> {
        services::metrics::init_metrics();

        let ledger = Ledger::new(store);
        let loads = Arc::new(LedgerLoadLookup::new(ledger.clone()));

        let mut providers = ProviderRegistry::new();
        providers.register(Arc::new(MockProvider::new()));

        let state = AppState {
            config: config.clone(),
            ledger: ledger.clone(),
            invoices: InvoiceService::new(ledger.clone(), loads),
            factoring: FactoringCoordinator::new(ledger.clone(), providers),
            payments: PaymentRecorder::new(ledger.clone()),
            webhooks: WebhookIngestor::new(ledger.clone()),
            sweeper: OverdueSweeper::new(ledger),
        };

        if config.sweep.enabled {
            tracing::info!(
                interval_secs = config.sweep.interval_secs,
                batch_size = config.sweep.batch_size,
                "Spawning overdue sweep loop"
            );
            let _ = state
                .sweeper
                .clone()
                .spawn(config.sweep.interval_secs, config.sweep.batch_size);
        }

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            .route(
                "/invoices",
                post(handlers::invoices::create_invoice).get(handlers::invoices::list_invoices),
            )
            .route("/invoices/:id", get(handlers::invoices::get_invoice))
            .route("/invoices/:id/send", post(handlers::invoices::send_invoice))
            .route("/invoices/:id/void", post(handlers::invoices::void_invoice))
            .route(
                "/invoices/:id/factoring",
                post(handlers::factoring::submit_factoring),
            )
            .route(
                "/invoices/:id/payments",
                post(handlers::payments::record_payment),
            )
            .route(
                "/webhooks/factoring/:provider",
                post(handlers::webhooks::provider_webhook),
            )
            .route("/sweeps/overdue", post(handlers::webhooks::run_overdue_sweep))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        actor_uid = tracing::field::Empty,
                        actor_role = tracing::field::Empty,
                    )
                }),
            )
            .with_state(state);

        Ok(Self {
            port: config.server.port,
            router,
        })
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        tracing::info!("Listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
