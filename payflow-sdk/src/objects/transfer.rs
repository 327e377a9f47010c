//! Outbound transfer types.

use serde::{Deserialize, Serialize};

/// Body element of `POST /v2/transfer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Amount in cents.
    pub amount: i64,
    pub name: String,
    pub tax_id: String,
    pub bank_code: String,
    pub branch_code: String,
    pub account_number: String,
    pub account_type: String,
    /// Processor-side idempotency key; a second transfer with the same value is refused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A transfer as returned by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub name: String,
}

/// `{"transfers": [...]}` wrapper used by both request and response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEnvelope<T> {
    pub transfers: Vec<T>,
}
