//! Webhook subscription types (`/v2/webhook`).

use serde::{Deserialize, Serialize};

/// Body of `POST /v2/webhook`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRequest {
    pub url: String,
    pub subscriptions: Vec<String>,
}

/// A registered webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub subscriptions: Vec<String>,
}

/// `{"webhook": {...}}` wrapper returned on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    pub webhook: Webhook,
}

/// One page of `GET /v2/webhook`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookList {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub webhooks: Vec<Webhook>,
}
