//! `GET /v2/public-key` response.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyEntry {
    #[serde(default)]
    pub id: String,
    /// PEM-encoded SubjectPublicKeyInfo.
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyList {
    pub public_keys: Vec<PublicKeyEntry>,
}
