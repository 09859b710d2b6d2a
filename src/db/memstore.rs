// db/memstore.rs
//
// In-memory substitute for the Postgres-backed stores, used by the service
// tests. Every trait method takes one lock for its whole body, which gives
// the same atomicity the database transaction gives in production.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::Error;
use uuid::Uuid;

use crate::db::affiliatedb::AffiliateStore;
use crate::db::ledgerdb::BalanceStore;
use crate::db::trackingdb::{ConversionWrite, NewConversion, TrackingStore, TrafficStats};
use crate::db::webhookdb::WebhookStore;
use crate::models::affiliatemodel::*;
use crate::models::trackingmodels::*;

#[derive(Default)]
struct Inner {
    affiliates: HashMap<Uuid, Affiliate>,
    links: Vec<AffiliateLink>,
    clicks: Vec<Click>,
    conversions: Vec<Conversion>,
    webhook_events: Vec<WebhookEvent>,
}

#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
    /// When non-zero, that many upcoming `insert_link` calls report a code
    /// collision. Lets tests exercise the registry's retry path.
    forced_link_conflicts: AtomicUsize,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_link_conflicts(&self, count: usize) {
        self.forced_link_conflicts.store(count, Ordering::SeqCst);
    }

    pub fn seed_affiliate(&self, status: AffiliateStatus, commission_rate: i32) -> Affiliate {
        let affiliate = Affiliate {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            commission_rate,
            balance_cents: 0,
            status,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        self.inner
            .lock()
            .unwrap()
            .affiliates
            .insert(affiliate.id, affiliate.clone());
        affiliate
    }

    pub fn seed_link(&self, affiliate_id: Uuid, code: &str) -> AffiliateLink {
        let link = AffiliateLink {
            id: Uuid::new_v4(),
            affiliate_id,
            code: code.to_string(),
            name: "seeded".to_string(),
            target_url: "https://example.com".to_string(),
            created_at: Some(Utc::now()),
        };
        self.inner.lock().unwrap().links.push(link.clone());
        link
    }

    /// Shift a click's timestamp into the past, for expiry tests.
    pub fn backdate_click(&self, cookie_id: &str, days: i64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(click) = inner.clicks.iter_mut().find(|c| c.cookie_id == cookie_id) {
            click.created_at = Some(Utc::now() - Duration::days(days));
        }
    }

    pub fn click_count(&self) -> usize {
        self.inner.lock().unwrap().clicks.len()
    }

    pub fn conversion_count(&self) -> usize {
        self.inner.lock().unwrap().conversions.len()
    }
}

#[async_trait]
impl AffiliateStore for MemStore {
    async fn create_affiliate(
        &self,
        user_id: Uuid,
        commission_rate: i32,
    ) -> Result<Affiliate, Error> {
        let affiliate = Affiliate {
            id: Uuid::new_v4(),
            user_id,
            commission_rate,
            balance_cents: 0,
            status: AffiliateStatus::Pending,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        self.inner
            .lock()
            .unwrap()
            .affiliates
            .insert(affiliate.id, affiliate.clone());
        Ok(affiliate)
    }

    async fn get_affiliate(&self, affiliate_id: Uuid) -> Result<Option<Affiliate>, Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .affiliates
            .get(&affiliate_id)
            .cloned())
    }

    async fn get_affiliate_by_user(&self, user_id: Uuid) -> Result<Option<Affiliate>, Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .affiliates
            .values()
            .find(|a| a.user_id == user_id)
            .cloned())
    }

    async fn update_affiliate_status(
        &self,
        affiliate_id: Uuid,
        status: AffiliateStatus,
    ) -> Result<Affiliate, Error> {
        let mut inner = self.inner.lock().unwrap();
        let affiliate = inner
            .affiliates
            .get_mut(&affiliate_id)
            .ok_or(Error::RowNotFound)?;
        affiliate.status = status;
        affiliate.updated_at = Some(Utc::now());
        Ok(affiliate.clone())
    }

    async fn insert_link(
        &self,
        affiliate_id: Uuid,
        code: &str,
        name: &str,
        target_url: &str,
    ) -> Result<Option<AffiliateLink>, Error> {
        if self
            .forced_link_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Ok(None);
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.links.iter().any(|l| l.code == code) {
            return Ok(None);
        }
        let link = AffiliateLink {
            id: Uuid::new_v4(),
            affiliate_id,
            code: code.to_string(),
            name: name.to_string(),
            target_url: target_url.to_string(),
            created_at: Some(Utc::now()),
        };
        inner.links.push(link.clone());
        Ok(Some(link))
    }

    async fn get_link_by_code(&self, code: &str) -> Result<Option<AffiliateLink>, Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .links
            .iter()
            .find(|l| l.code == code)
            .cloned())
    }

    async fn get_link(&self, link_id: Uuid) -> Result<Option<AffiliateLink>, Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .links
            .iter()
            .find(|l| l.id == link_id)
            .cloned())
    }

    async fn list_links(&self, affiliate_id: Uuid) -> Result<Vec<AffiliateLink>, Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .links
            .iter()
            .filter(|l| l.affiliate_id == affiliate_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TrackingStore for MemStore {
    async fn insert_click(
        &self,
        link_id: Uuid,
        cookie_id: &str,
        visitor_ip: Option<&str>,
        referrer: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<Click, Error> {
        let mut inner = self.inner.lock().unwrap();
        if inner.clicks.iter().any(|c| c.cookie_id == cookie_id) {
            // Mirrors the unique constraint on clicks.cookie_id.
            return Err(Error::RowNotFound);
        }
        let click = Click {
            id: Uuid::new_v4(),
            link_id,
            cookie_id: cookie_id.to_string(),
            visitor_ip: visitor_ip.map(str::to_string),
            referrer: referrer.map(str::to_string),
            user_agent: user_agent.map(str::to_string),
            created_at: Some(Utc::now()),
        };
        inner.clicks.push(click.clone());
        Ok(click)
    }

    async fn get_click_by_cookie(
        &self,
        cookie_id: &str,
        within_days: i32,
    ) -> Result<Option<Click>, Error> {
        let cutoff = Utc::now() - Duration::days(within_days as i64);
        Ok(self
            .inner
            .lock()
            .unwrap()
            .clicks
            .iter()
            .find(|c| c.cookie_id == cookie_id && c.created_at.map_or(false, |t| t > cutoff))
            .cloned())
    }

    async fn get_attributed_click_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Click>, Error> {
        let inner = self.inner.lock().unwrap();
        let mut attributed: Vec<&Conversion> = inner
            .conversions
            .iter()
            .filter(|cv| cv.converting_user_id == Some(user_id))
            .collect();
        attributed.sort_by_key(|cv| cv.created_at);
        let click_id = match attributed.first() {
            Some(cv) => cv.click_id,
            None => return Ok(None),
        };
        Ok(inner.clicks.iter().find(|c| c.id == click_id).cloned())
    }

    async fn get_conversion(
        &self,
        click_id: Uuid,
        conversion_type: ConversionType,
    ) -> Result<Option<Conversion>, Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .conversions
            .iter()
            .find(|cv| cv.click_id == click_id && cv.conversion_type == conversion_type)
            .cloned())
    }

    async fn record_conversion_with_credit(
        &self,
        new: NewConversion,
    ) -> Result<ConversionWrite, Error> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(existing) = inner
            .conversions
            .iter()
            .find(|cv| cv.click_id == new.click_id && cv.conversion_type == new.conversion_type)
        {
            return Ok(ConversionWrite::Duplicate(existing.clone()));
        }

        let conversion = Conversion {
            id: Uuid::new_v4(),
            click_id: new.click_id,
            converting_user_id: new.converting_user_id,
            amount_cents: new.amount_cents,
            commission_cents: new.commission_cents,
            commission_rate: new.commission_rate,
            conversion_type: new.conversion_type,
            status: ConversionStatus::Completed,
            created_at: Some(Utc::now()),
        };
        inner.conversions.push(conversion.clone());

        let affiliate = inner
            .affiliates
            .get_mut(&new.affiliate_id)
            .ok_or(Error::RowNotFound)?;
        affiliate.balance_cents += new.commission_cents;
        let new_balance_cents = affiliate.balance_cents;

        Ok(ConversionWrite::Inserted {
            conversion,
            new_balance_cents,
        })
    }

    async fn affiliate_traffic_stats(&self, affiliate_id: Uuid) -> Result<TrafficStats, Error> {
        let inner = self.inner.lock().unwrap();
        let link_ids: Vec<Uuid> = inner
            .links
            .iter()
            .filter(|l| l.affiliate_id == affiliate_id)
            .map(|l| l.id)
            .collect();
        let click_ids: Vec<Uuid> = inner
            .clicks
            .iter()
            .filter(|c| link_ids.contains(&c.link_id))
            .map(|c| c.id)
            .collect();
        let conversions: Vec<&Conversion> = inner
            .conversions
            .iter()
            .filter(|cv| {
                click_ids.contains(&cv.click_id) && cv.status == ConversionStatus::Completed
            })
            .collect();

        Ok(TrafficStats {
            total_clicks: click_ids.len() as i64,
            total_conversions: conversions.len() as i64,
            total_commission_cents: conversions.iter().map(|cv| cv.commission_cents).sum(),
        })
    }
}

#[async_trait]
impl BalanceStore for MemStore {
    async fn credit_balance(&self, affiliate_id: Uuid, amount_cents: i64) -> Result<i64, Error> {
        let mut inner = self.inner.lock().unwrap();
        let affiliate = inner
            .affiliates
            .get_mut(&affiliate_id)
            .ok_or(Error::RowNotFound)?;
        affiliate.balance_cents += amount_cents;
        Ok(affiliate.balance_cents)
    }

    async fn get_balance(&self, affiliate_id: Uuid) -> Result<i64, Error> {
        self.inner
            .lock()
            .unwrap()
            .affiliates
            .get(&affiliate_id)
            .map(|a| a.balance_cents)
            .ok_or(Error::RowNotFound)
    }
}

#[async_trait]
impl WebhookStore for MemStore {
    async fn insert_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<Option<WebhookEvent>, Error> {
        let mut inner = self.inner.lock().unwrap();
        if inner.webhook_events.iter().any(|e| e.event_id == event_id) {
            return Ok(None);
        }
        let event = WebhookEvent {
            id: Uuid::new_v4(),
            event_id: event_id.to_string(),
            event_type: event_type.to_string(),
            payload: payload.clone(),
            status: WebhookStatus::Received,
            error: None,
            attempts: 0,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        inner.webhook_events.push(event.clone());
        Ok(Some(event))
    }

    async fn mark_webhook_event(
        &self,
        id: Uuid,
        status: WebhookStatus,
        error: Option<&str>,
    ) -> Result<WebhookEvent, Error> {
        let mut inner = self.inner.lock().unwrap();
        let event = inner
            .webhook_events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(Error::RowNotFound)?;
        event.status = status;
        event.error = error.map(str::to_string);
        event.attempts += 1;
        event.updated_at = Some(Utc::now());
        Ok(event.clone())
    }

    async fn list_failed_webhook_events(
        &self,
        max_attempts: i32,
        limit: i64,
    ) -> Result<Vec<WebhookEvent>, Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .webhook_events
            .iter()
            .filter(|e| e.status == WebhookStatus::Failed && e.attempts < max_attempts)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
