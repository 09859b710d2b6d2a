// handler/webhook.rs
use std::sync::Arc;

use axum::{http::HeaderMap, response::IntoResponse, Extension, Json};

use crate::{error::HttpError, AppState};

/// Payment-provider webhook endpoint.
///
/// Requests must carry a valid HMAC signature over the raw body; anything
/// else is rejected before processing. Authenticated events are always
/// acknowledged with 200 — internal failures land in `webhook_events` and
/// are retried by the reconciliation job, never bounced back to the
/// provider.
pub async fn payment_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, HttpError> {
    let signature = headers
        .get("x-webhook-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| HttpError::bad_request("Missing webhook signature"))?;

    if !app_state
        .ingestor
        .verify_signature(body.as_bytes(), signature)
    {
        tracing::warn!("Invalid payment webhook signature received");
        return Err(HttpError::unauthorized("Invalid webhook signature"));
    }

    let payload: serde_json::Value = serde_json::from_str(&body)
        .map_err(|_| HttpError::bad_request("Webhook body is not valid JSON"))?;

    if let Err(e) = app_state.ingestor.ingest(payload).await {
        // Ack regardless: the event (if it got far enough to be recorded)
        // will be picked up by reconciliation.
        tracing::error!("Webhook ingestion error: {}", e);
    }

    Ok(Json(serde_json::json!({"status": "success"})))
}
