//! Invoice creation and listing types.

use serde::{Deserialize, Serialize};

/// A key/value line shown to the payer on the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDescription {
    pub key: String,
    pub value: String,
}

/// Body element of `POST /v2/invoice`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRequest {
    /// Amount in cents.
    pub amount: i64,
    pub name: String,
    pub tax_id: String,
    /// Due date, RFC 3339.
    #[serde(with = "time::serde::rfc3339")]
    pub due: time::OffsetDateTime,
    /// Seconds after `due` until the invoice can no longer be paid.
    pub expiration: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descriptions: Vec<InvoiceDescription>,
}

/// An invoice as returned by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tax_id: String,
    #[serde(default)]
    pub fee: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// `{"invoices": [...]}` wrapper used by both request and response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceEnvelope<T> {
    pub invoices: Vec<T>,
}

/// One page of `GET /v2/invoice`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePage {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
}
