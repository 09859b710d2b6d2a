// service/click_service.rs
use std::sync::Arc;

use crate::{
    db::{affiliatedb::AffiliateStore, is_unique_violation, trackingdb::TrackingStore},
    service::error::ServiceError,
    utils::codes::{generate_attribution_token, normalize_code},
};

const MAX_TOKEN_ATTEMPTS: u32 = 3;

/// Records referral visits and issues attribution tokens.
#[derive(Debug, Clone)]
pub struct ClickTracker<S> {
    store: Arc<S>,
}

impl<S> ClickTracker<S>
where
    S: AffiliateStore + TrackingStore + Send + Sync,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Record one click against a referral code and hand back the token the
    /// caller stores client-side.
    ///
    /// An unknown code surfaces as `NotFound`; the page-load HTTP boundary
    /// swallows it so a bad `?ref=` never breaks the visited page. Exactly
    /// one Click row per call; repeat visits each get their own token.
    pub async fn record_click(
        &self,
        code: &str,
        referrer: Option<&str>,
        user_agent: Option<&str>,
        visitor_ip: Option<&str>,
    ) -> Result<String, ServiceError> {
        let link = self
            .store
            .get_link_by_code(&normalize_code(code))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Referral code {}", code)))?;

        // The token is the attribution credential. It is generated here,
        // never accepted from the client, and the unique index on cookie_id
        // backstops the (astronomically unlikely) generator collision.
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let token = generate_attribution_token();
            match self
                .store
                .insert_click(link.id, &token, visitor_ip, referrer, user_agent)
                .await
            {
                Ok(_) => return Ok(token),
                Err(e) if is_unique_violation(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Contention(
            "Could not allocate a unique attribution token".to_string(),
        ))
    }
}
