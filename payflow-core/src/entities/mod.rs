pub mod invoice_records;

pub use invoice_records::{InvoiceRecord, InvoiceStats, InvoiceStatus, LedgerError, NewInvoiceRecord};
