// models/trackingmodels.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "conversion_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversionType {
    Signup,
    Subscription,
    Purchase,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "conversion_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Completed,
    Reversed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "webhook_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Received,
    Processed,
    Skipped,
    Failed,
}

/// A single referral visit. `cookie_id` is the server-issued attribution
/// token handed back to the visitor; it is never client-supplied. Rows are
/// append-only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Click {
    pub id: Uuid,
    pub link_id: Uuid,
    pub cookie_id: String,
    pub visitor_ip: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A commission-bearing event attributed to a click.
///
/// `commission_rate` is frozen at write time: later changes to the
/// affiliate's rate never alter historical commissions. At most one row per
/// `(click_id, conversion_type)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversion {
    pub id: Uuid,
    pub click_id: Uuid,
    pub converting_user_id: Option<Uuid>,
    pub amount_cents: i64,
    pub commission_cents: i64,
    pub commission_rate: i32,
    pub conversion_type: ConversionType,
    pub status: ConversionStatus,
    pub created_at: Option<DateTime<Utc>>,
}

/// Durable record of an inbound payment-provider event.
///
/// `event_id` is the provider's own id and is unique, which makes redelivery
/// a no-op. Failed rows are retried by the reconciliation job.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WebhookEvent {
    pub id: Uuid,
    pub event_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub status: WebhookStatus,
    pub error: Option<String>,
    pub attempts: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Conversion {
    pub fn amount(&self) -> f64 {
        self.amount_cents as f64 / 100.0
    }

    pub fn commission(&self) -> f64 {
        self.commission_cents as f64 / 100.0
    }
}
