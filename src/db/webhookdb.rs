// db/webhookdb.rs
use async_trait::async_trait;
use sqlx::Error;

use super::db::DBClient;
use crate::models::trackingmodels::{WebhookEvent, WebhookStatus};

#[async_trait]
pub trait WebhookStore {
    /// Record an inbound provider event. Returns `None` when the provider
    /// event id has been seen before, which is how redeliveries short-circuit.
    async fn insert_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<Option<WebhookEvent>, Error>;

    async fn mark_webhook_event(
        &self,
        id: uuid::Uuid,
        status: WebhookStatus,
        error: Option<&str>,
    ) -> Result<WebhookEvent, Error>;

    /// Failed events still under the attempt budget, oldest first.
    async fn list_failed_webhook_events(
        &self,
        max_attempts: i32,
        limit: i64,
    ) -> Result<Vec<WebhookEvent>, Error>;
}

#[async_trait]
impl WebhookStore for DBClient {
    async fn insert_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<Option<WebhookEvent>, Error> {
        sqlx::query_as::<_, WebhookEvent>(
            r#"
            INSERT INTO webhook_events (event_id, event_type, payload)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
            RETURNING
                id,
                event_id,
                event_type,
                payload,
                status,
                error,
                attempts,
                created_at,
                updated_at
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .bind(payload)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_webhook_event(
        &self,
        id: uuid::Uuid,
        status: WebhookStatus,
        error: Option<&str>,
    ) -> Result<WebhookEvent, Error> {
        sqlx::query_as::<_, WebhookEvent>(
            r#"
            UPDATE webhook_events
            SET status = $2, error = $3, attempts = attempts + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING
                id,
                event_id,
                event_type,
                payload,
                status,
                error,
                attempts,
                created_at,
                updated_at
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(error)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_failed_webhook_events(
        &self,
        max_attempts: i32,
        limit: i64,
    ) -> Result<Vec<WebhookEvent>, Error> {
        sqlx::query_as::<_, WebhookEvent>(
            r#"
            SELECT
                id,
                event_id,
                event_type,
                payload,
                status,
                error,
                attempts,
                created_at,
                updated_at
            FROM webhook_events
            WHERE status = 'failed' AND attempts < $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
