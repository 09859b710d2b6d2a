// service/conversion_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{
        affiliatedb::AffiliateStore,
        is_serialization_conflict,
        ledgerdb::BalanceStore,
        trackingdb::{ConversionWrite, NewConversion, TrackingStore},
    },
    models::{affiliatemodel::AffiliateStatus, trackingmodels::*},
    service::error::ServiceError,
    utils::currency::commission_cents,
};

/// How many times the conversion transaction is retried on a serialization
/// conflict before surfacing Contention.
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Result of a conversion attempt. The first two are successes from the
/// caller's perspective; `Unattributed` carries no commission at all.
#[derive(Debug)]
pub enum ConversionOutcome {
    /// No (valid, unexpired) attribution token: nothing recorded, nobody
    /// credited. This is the common case and never an error.
    Unattributed,
    /// Conversion persisted and the affiliate credited.
    Recorded(Conversion),
    /// A conversion already existed for this (click, type) pair. No second
    /// credit happened.
    AlreadyRecorded(Conversion),
}

impl ConversionOutcome {
    pub fn conversion_id(&self) -> Option<Uuid> {
        match self {
            ConversionOutcome::Unattributed => None,
            ConversionOutcome::Recorded(c) | ConversionOutcome::AlreadyRecorded(c) => Some(c.id),
        }
    }
}

/// Resolves attribution tokens to affiliates and writes commission records.
#[derive(Debug, Clone)]
pub struct ConversionRecorder<S> {
    store: Arc<S>,
    window_days: i32,
}

impl<S> ConversionRecorder<S>
where
    S: AffiliateStore + TrackingStore + BalanceStore + Send + Sync,
{
    pub fn new(store: Arc<S>, window_days: i32) -> Self {
        Self { store, window_days }
    }

    /// Record a conversion against an attribution token.
    ///
    /// Unknown or expired tokens are a no-op success: most conversions have
    /// no referral behind them. A click whose link or affiliate is missing
    /// is a data integrity violation and fails hard.
    pub async fn record_conversion(
        &self,
        attribution_token: Option<&str>,
        converting_user_id: Option<Uuid>,
        amount_cents: i64,
        conversion_type: ConversionType,
    ) -> Result<ConversionOutcome, ServiceError> {
        if amount_cents < 0 {
            return Err(ServiceError::Validation(
                "Conversion amount cannot be negative".to_string(),
            ));
        }

        let token = match attribution_token {
            Some(t) if !t.is_empty() => t,
            _ => return Ok(ConversionOutcome::Unattributed),
        };

        let click = match self
            .store
            .get_click_by_cookie(token, self.window_days)
            .await?
        {
            Some(click) => click,
            None => {
                tracing::debug!("Attribution token did not resolve to a live click");
                return Ok(ConversionOutcome::Unattributed);
            }
        };

        self.record_for_click(click, converting_user_id, amount_cents, conversion_type)
            .await
    }

    /// Webhook-path entry: attribute through the user's earliest recorded
    /// conversion instead of a token, since tokens in provider payloads are
    /// untrusted.
    pub async fn record_conversion_for_user(
        &self,
        user_id: Uuid,
        amount_cents: i64,
        conversion_type: ConversionType,
    ) -> Result<ConversionOutcome, ServiceError> {
        if amount_cents < 0 {
            return Err(ServiceError::Validation(
                "Conversion amount cannot be negative".to_string(),
            ));
        }

        let click = match self.store.get_attributed_click_for_user(user_id).await? {
            Some(click) => click,
            None => return Ok(ConversionOutcome::Unattributed),
        };

        self.record_for_click(click, Some(user_id), amount_cents, conversion_type)
            .await
    }

    async fn record_for_click(
        &self,
        click: Click,
        converting_user_id: Option<Uuid>,
        amount_cents: i64,
        conversion_type: ConversionType,
    ) -> Result<ConversionOutcome, ServiceError> {
        let link = self.store.get_link(click.link_id).await?.ok_or_else(|| {
            tracing::error!("Click {} references missing link {}", click.id, click.link_id);
            ServiceError::NotFound(format!("Link for click {}", click.id))
        })?;

        let affiliate = self
            .store
            .get_affiliate(link.affiliate_id)
            .await?
            .ok_or_else(|| {
                tracing::error!(
                    "Link {} references missing affiliate {}",
                    link.id,
                    link.affiliate_id
                );
                ServiceError::NotFound(format!("Affiliate for link {}", link.id))
            })?;

        if affiliate.status != AffiliateStatus::Active {
            return Err(ServiceError::InvalidState(format!(
                "Affiliate {} is not active and cannot accrue commission",
                affiliate.id
            )));
        }

        // The rate is snapshotted into the row here; later rate changes
        // never touch this commission.
        let commission = commission_cents(amount_cents, affiliate.commission_rate);

        let new = NewConversion {
            click_id: click.id,
            affiliate_id: affiliate.id,
            converting_user_id,
            amount_cents,
            commission_cents: commission,
            commission_rate: affiliate.commission_rate,
            conversion_type,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.record_conversion_with_credit(new.clone()).await {
                Ok(ConversionWrite::Inserted {
                    conversion,
                    new_balance_cents,
                }) => {
                    tracing::info!(
                        "Recorded {:?} conversion {} for affiliate {}: commission {} cents, balance now {} cents",
                        conversion_type,
                        conversion.id,
                        affiliate.id,
                        commission,
                        new_balance_cents
                    );
                    return Ok(ConversionOutcome::Recorded(conversion));
                }
                Ok(ConversionWrite::Duplicate(existing)) => {
                    tracing::info!(
                        "Conversion for click {} / {:?} already recorded, no second credit",
                        click.id,
                        conversion_type
                    );
                    return Ok(ConversionOutcome::AlreadyRecorded(existing));
                }
                Err(e) if is_serialization_conflict(&e) && attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::warn!(
                        "Serialization conflict recording conversion (attempt {}/{})",
                        attempt,
                        MAX_WRITE_ATTEMPTS
                    );
                }
                Err(e) if is_serialization_conflict(&e) => {
                    return Err(ServiceError::Contention(
                        "Conversion write retry budget exhausted".to_string(),
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
