//! Webhook ingress.
//!
//! `POST /webhook` only hands the raw callback to the event queue. Signature
//! verification, parsing and settlement all happen in the event processor,
//! so the processor gets its `200` as fast as possible.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use payflow_core::events::QueuedEvent;
use payflow_sdk::signature::SIGNATURE_HEADER;
use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Queued {
    status: &'static str,
}

/// Errors that can occur while accepting a callback.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("empty body")]
    EmptyBody,
    #[error("event queue closed")]
    QueueClosed,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match self {
            WebhookError::EmptyBody => StatusCode::BAD_REQUEST,
            WebhookError::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Queued>, WebhookError> {
    if body.is_empty() {
        state.counters.record_error();
        tracing::warn!("Webhook rejected: empty body");
        return Err(WebhookError::EmptyBody);
    }

    // a missing header is queued as an empty signature and rejected downstream
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let size = body.len();
    state
        .queue
        .send(QueuedEvent::new(body, signature, state.mock_mode))
        .map_err(|_| {
            state.counters.record_error();
            tracing::error!("Event queue closed, dropping webhook");
            WebhookError::QueueClosed
        })?;
    state.counters.record_received(OffsetDateTime::now_utc());
    tracing::debug!(size, "Webhook queued");

    Ok(Json(Queued { status: "queued" }))
}
