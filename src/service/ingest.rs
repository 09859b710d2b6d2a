// service/ingest.rs
use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha512;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{
    db::{
        affiliatedb::AffiliateStore, ledgerdb::BalanceStore, trackingdb::TrackingStore,
        webhookdb::WebhookStore,
    },
    models::trackingmodels::{ConversionType, WebhookEvent, WebhookStatus},
    service::{
        conversion_service::{ConversionOutcome, ConversionRecorder},
        error::ServiceError,
    },
};

/// Attempt budget for the reconciliation job.
pub const MAX_EVENT_ATTEMPTS: i32 = 5;

/// Which provider event types generate a commission if attributable.
fn qualifying_conversion_type(event_type: &str) -> Option<ConversionType> {
    match event_type {
        "subscription.created" => Some(ConversionType::Subscription),
        "payment.succeeded" => Some(ConversionType::Purchase),
        _ => None,
    }
}

/// Receives untrusted payment-provider events and drives them through the
/// conversion recorder.
///
/// Policy: once a request authenticates, the provider always gets a 200 —
/// failures are recorded in `webhook_events` and retried internally, never
/// surfaced as "please retry" to the source. That is only safe because
/// conversion recording is idempotent on both the provider event id and the
/// (click, type) pair.
#[derive(Debug, Clone)]
pub struct PaymentEventIngestor<S> {
    store: Arc<S>,
    recorder: ConversionRecorder<S>,
    webhook_secret: String,
}

impl<S> PaymentEventIngestor<S>
where
    S: WebhookStore + AffiliateStore + TrackingStore + BalanceStore + Send + Sync,
{
    pub fn new(store: Arc<S>, webhook_secret: String, window_days: i32) -> Self {
        Self {
            recorder: ConversionRecorder::new(store.clone(), window_days),
            store,
            webhook_secret,
        }
    }

    /// Verify the HMAC-SHA512 hex signature the provider sends over the raw
    /// request body. Constant-time compare to keep timing out of the oracle.
    pub fn verify_signature(&self, body: &[u8], signature: &str) -> bool {
        let mut mac = Hmac::<Sha512>::new_from_slice(self.webhook_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(body);

        let expected_hex = hex::encode(mac.finalize().into_bytes());

        ConstantTimeEq::ct_eq(signature.as_bytes(), expected_hex.as_bytes()).into()
    }

    /// Ingest one authenticated event. Internal processing failures are
    /// recorded against the event row and do not propagate; only a failure
    /// to even record the event surfaces as an error.
    pub async fn ingest(&self, payload: Value) -> Result<(), ServiceError> {
        let event_id = payload["id"]
            .as_str()
            .ok_or_else(|| ServiceError::Validation("Missing event id".to_string()))?
            .to_string();
        let event_type = payload["event"]
            .as_str()
            .ok_or_else(|| ServiceError::Validation("Missing event type".to_string()))?
            .to_string();

        let event = match self
            .store
            .insert_webhook_event(&event_id, &event_type, &payload)
            .await?
        {
            Some(event) => event,
            None => {
                tracing::info!("Duplicate webhook event {}, acknowledging without work", event_id);
                return Ok(());
            }
        };

        match self.process(&event).await {
            Ok(status) => {
                self.store.mark_webhook_event(event.id, status, None).await?;
            }
            Err(e) => {
                tracing::error!("Failed to process webhook event {}: {}", event.event_id, e);
                self.store
                    .mark_webhook_event(event.id, WebhookStatus::Failed, Some(&e.to_string()))
                    .await?;
            }
        }

        Ok(())
    }

    async fn process(&self, event: &WebhookEvent) -> Result<WebhookStatus, ServiceError> {
        let conversion_type = match qualifying_conversion_type(&event.event_type) {
            Some(t) => t,
            None => {
                tracing::info!("Unhandled webhook event type: {}", event.event_type);
                return Ok(WebhookStatus::Skipped);
            }
        };

        let data = &event.payload["data"];

        let user_id = data["user_id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| {
                ServiceError::Validation("Missing or invalid user_id in event data".to_string())
            })?;

        // Provider amounts arrive in the smallest currency unit.
        let amount_cents = data["amount"]
            .as_i64()
            .ok_or_else(|| ServiceError::Validation("Missing amount in event data".to_string()))?;

        let outcome = self
            .recorder
            .record_conversion_for_user(user_id, amount_cents, conversion_type)
            .await?;

        match outcome {
            ConversionOutcome::Unattributed => {
                tracing::debug!("Event {} has no referral attribution", event.event_id);
            }
            ConversionOutcome::Recorded(ref c) => {
                tracing::info!("Event {} recorded conversion {}", event.event_id, c.id);
            }
            ConversionOutcome::AlreadyRecorded(_) => {
                tracing::info!("Event {} matched an existing conversion", event.event_id);
            }
        }

        Ok(WebhookStatus::Processed)
    }

    /// Re-run failed events still under the attempt budget. Called from the
    /// reconciliation job.
    pub async fn reprocess_failed(&self) -> Result<usize, ServiceError> {
        let events = self
            .store
            .list_failed_webhook_events(MAX_EVENT_ATTEMPTS, 50)
            .await?;
        let count = events.len();

        for event in events {
            match self.process(&event).await {
                Ok(status) => {
                    self.store.mark_webhook_event(event.id, status, None).await?;
                }
                Err(e) => {
                    tracing::warn!(
                        "Webhook event {} failed again (attempt {}): {}",
                        event.event_id,
                        event.attempts + 1,
                        e
                    );
                    self.store
                        .mark_webhook_event(event.id, WebhookStatus::Failed, Some(&e.to_string()))
                        .await?;
                }
            }
        }

        Ok(count)
    }
}
