// models/affiliatemodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "affiliate_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AffiliateStatus {
    Pending,
    Active,
    Suspended,
}

/// An approved (or pending) member of the affiliate program.
///
/// `balance_cents` is mutated only through the ledger credit path; every
/// other component treats this row as read-only after creation. Affiliates
/// are never deleted, only suspended.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Affiliate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub commission_rate: i32,
    pub balance_cents: i64,
    pub status: AffiliateStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A shareable referral link. `code` is globally unique and immutable once
/// created.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AffiliateLink {
    pub id: Uuid,
    pub affiliate_id: Uuid,
    pub code: String,
    pub name: String,
    pub target_url: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Affiliate {
    pub fn balance(&self) -> f64 {
        self.balance_cents as f64 / 100.0
    }
}
