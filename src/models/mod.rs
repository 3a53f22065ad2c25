pub mod actor;
pub mod factoring;
pub mod invoice;
pub mod load;
pub mod payment;
pub mod webhook;

pub use actor::{Actor, UserRole};
pub use factoring::{FactoringSubmissionRecord, SubmissionStatus};
pub use invoice::{
    Attachment, AttachmentKind, CreateInvoiceInput, InvoiceRecord, InvoiceStatus, Party,
};
pub use load::LoadRecord;
pub use payment::{PaymentMethod, PaymentTransactionRecord};
pub use webhook::WebhookEventRecord;
