// service/link_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::affiliatedb::AffiliateStore,
    models::affiliatemodel::*,
    service::error::ServiceError,
    utils::codes::{generate_referral_code, normalize_code},
};

/// How many fresh codes to try before giving up. A collision in the 36^8
/// space is rare, but it is handled, not assumed away.
const MAX_CODE_ATTEMPTS: u32 = 5;

/// Owns the affiliate -> code -> link mapping.
#[derive(Debug, Clone)]
pub struct LinkRegistry<S> {
    store: Arc<S>,
}

impl<S> LinkRegistry<S>
where
    S: AffiliateStore + Send + Sync,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a link under a freshly generated unique code.
    pub async fn create_link(
        &self,
        affiliate_id: Uuid,
        name: &str,
        target_url: &str,
    ) -> Result<AffiliateLink, ServiceError> {
        let affiliate = self
            .store
            .get_affiliate(affiliate_id)
            .await?
            .ok_or_else(|| ServiceError::Validation("Affiliate does not exist".to_string()))?;

        if affiliate.status != AffiliateStatus::Active {
            return Err(ServiceError::Validation(
                "Affiliate is not active and cannot create links".to_string(),
            ));
        }

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_referral_code();
            if let Some(link) = self
                .store
                .insert_link(affiliate_id, &code, name, target_url)
                .await?
            {
                return Ok(link);
            }
            tracing::warn!(
                "Referral code collision for affiliate {} (attempt {}/{})",
                affiliate_id,
                attempt,
                MAX_CODE_ATTEMPTS
            );
        }

        Err(ServiceError::Contention(
            "Could not allocate a unique referral code".to_string(),
        ))
    }

    /// Resolve a user-supplied code to its link. Codes are generated from a
    /// fixed-case alphabet, so lookup normalizes case first.
    pub async fn resolve_link(&self, code: &str) -> Result<AffiliateLink, ServiceError> {
        self.store
            .get_link_by_code(&normalize_code(code))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Referral code {}", code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memstore::MemStore;

    #[tokio::test]
    async fn creates_link_for_active_affiliate() {
        let store = Arc::new(MemStore::new());
        let affiliate = store.seed_affiliate(AffiliateStatus::Active, 20);
        let registry = LinkRegistry::new(store);

        let link = registry
            .create_link(affiliate.id, "Homepage", "https://example.com")
            .await
            .unwrap();

        assert_eq!(link.affiliate_id, affiliate.id);
        assert_eq!(link.code.len(), crate::utils::codes::CODE_LENGTH);
        assert_eq!(link.code, link.code.to_ascii_uppercase());
    }

    #[tokio::test]
    async fn rejects_unknown_affiliate() {
        let registry = LinkRegistry::new(Arc::new(MemStore::new()));
        let err = registry
            .create_link(Uuid::new_v4(), "Homepage", "https://example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn rejects_suspended_affiliate() {
        let store = Arc::new(MemStore::new());
        let affiliate = store.seed_affiliate(AffiliateStatus::Suspended, 20);
        let registry = LinkRegistry::new(store);

        let err = registry
            .create_link(affiliate.id, "Homepage", "https://example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn retries_through_code_collisions() {
        let store = Arc::new(MemStore::new());
        let affiliate = store.seed_affiliate(AffiliateStatus::Active, 20);
        // First two generation attempts collide; the registry must still
        // come back with a usable link.
        store.force_link_conflicts(2);
        let registry = LinkRegistry::new(store.clone());

        let first = registry
            .create_link(affiliate.id, "One", "https://example.com/1")
            .await
            .unwrap();
        let second = registry
            .create_link(affiliate.id, "Two", "https://example.com/2")
            .await
            .unwrap();

        assert_ne!(first.code, second.code);
        assert!(registry.resolve_link(&first.code).await.is_ok());
        assert!(registry.resolve_link(&second.code).await.is_ok());
    }

    #[tokio::test]
    async fn gives_up_after_retry_budget() {
        let store = Arc::new(MemStore::new());
        let affiliate = store.seed_affiliate(AffiliateStatus::Active, 20);
        store.force_link_conflicts(100);
        let registry = LinkRegistry::new(store);

        let err = registry
            .create_link(affiliate.id, "Doomed", "https://example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Contention(_)));
    }

    #[tokio::test]
    async fn resolve_is_case_normalized() {
        let store = Arc::new(MemStore::new());
        let affiliate = store.seed_affiliate(AffiliateStatus::Active, 20);
        store.seed_link(affiliate.id, "ABC123XY");
        let registry = LinkRegistry::new(store);

        assert!(registry.resolve_link("abc123xy").await.is_ok());
        assert!(registry.resolve_link("ABC123XY").await.is_ok());
        let err = registry.resolve_link("NOPE0000").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
