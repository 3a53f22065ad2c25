pub mod factoring;
pub mod lifecycle;
pub mod loads;
pub mod metrics;
pub mod payments;
pub mod state_machine;
pub mod sweeper;
pub mod webhooks;

pub use factoring::{
    FactoringCoordinator, FactoringProvider, MockProvider, ProviderDecision, ProviderRegistry,
};
pub use lifecycle::InvoiceService;
pub use loads::{LedgerLoadLookup, LoadLookup};
pub use payments::{PaymentRecorder, RecordPaymentInput};
pub use sweeper::OverdueSweeper;
pub use webhooks::{ProcessEventInput, WebhookIngestor};
