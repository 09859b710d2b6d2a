// db/affiliatedb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::affiliatemodel::*;

/// Repository for affiliates and their links. Injected into the services so
/// tests can substitute an in-memory fake.
#[async_trait]
pub trait AffiliateStore {
    async fn create_affiliate(
        &self,
        user_id: Uuid,
        commission_rate: i32,
    ) -> Result<Affiliate, Error>;

    async fn get_affiliate(&self, affiliate_id: Uuid) -> Result<Option<Affiliate>, Error>;

    async fn get_affiliate_by_user(&self, user_id: Uuid) -> Result<Option<Affiliate>, Error>;

    async fn update_affiliate_status(
        &self,
        affiliate_id: Uuid,
        status: AffiliateStatus,
    ) -> Result<Affiliate, Error>;

    /// Insert a link with a pre-generated code. Returns `None` when the code
    /// already exists; the registry retries with a fresh code.
    async fn insert_link(
        &self,
        affiliate_id: Uuid,
        code: &str,
        name: &str,
        target_url: &str,
    ) -> Result<Option<AffiliateLink>, Error>;

    async fn get_link_by_code(&self, code: &str) -> Result<Option<AffiliateLink>, Error>;

    async fn get_link(&self, link_id: Uuid) -> Result<Option<AffiliateLink>, Error>;

    async fn list_links(&self, affiliate_id: Uuid) -> Result<Vec<AffiliateLink>, Error>;
}

#[async_trait]
impl AffiliateStore for DBClient {
    async fn create_affiliate(
        &self,
        user_id: Uuid,
        commission_rate: i32,
    ) -> Result<Affiliate, Error> {
        sqlx::query_as::<_, Affiliate>(
            r#"
            INSERT INTO affiliates (user_id, commission_rate)
            VALUES ($1, $2)
            RETURNING
                id,
                user_id,
                commission_rate,
                balance_cents,
                status,
                created_at,
                updated_at
            "#,
        )
        .bind(user_id)
        .bind(commission_rate)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_affiliate(&self, affiliate_id: Uuid) -> Result<Option<Affiliate>, Error> {
        sqlx::query_as::<_, Affiliate>(
            r#"
            SELECT
                id,
                user_id,
                commission_rate,
                balance_cents,
                status,
                created_at,
                updated_at
            FROM affiliates
            WHERE id = $1
            "#,
        )
        .bind(affiliate_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_affiliate_by_user(&self, user_id: Uuid) -> Result<Option<Affiliate>, Error> {
        sqlx::query_as::<_, Affiliate>(
            r#"
            SELECT
                id,
                user_id,
                commission_rate,
                balance_cents,
                status,
                created_at,
                updated_at
            FROM affiliates
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_affiliate_status(
        &self,
        affiliate_id: Uuid,
        status: AffiliateStatus,
    ) -> Result<Affiliate, Error> {
        sqlx::query_as::<_, Affiliate>(
            r#"
            UPDATE affiliates
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING
                id,
                user_id,
                commission_rate,
                balance_cents,
                status,
                created_at,
                updated_at
            "#,
        )
        .bind(affiliate_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    async fn insert_link(
        &self,
        affiliate_id: Uuid,
        code: &str,
        name: &str,
        target_url: &str,
    ) -> Result<Option<AffiliateLink>, Error> {
        // ON CONFLICT DO NOTHING turns a code collision into a None the
        // registry can retry on, instead of a hard error.
        sqlx::query_as::<_, AffiliateLink>(
            r#"
            INSERT INTO affiliate_links (affiliate_id, code, name, target_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (code) DO NOTHING
            RETURNING
                id,
                affiliate_id,
                code,
                name,
                target_url,
                created_at
            "#,
        )
        .bind(affiliate_id)
        .bind(code)
        .bind(name)
        .bind(target_url)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_link_by_code(&self, code: &str) -> Result<Option<AffiliateLink>, Error> {
        sqlx::query_as::<_, AffiliateLink>(
            r#"
            SELECT
                id,
                affiliate_id,
                code,
                name,
                target_url,
                created_at
            FROM affiliate_links
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_link(&self, link_id: Uuid) -> Result<Option<AffiliateLink>, Error> {
        sqlx::query_as::<_, AffiliateLink>(
            r#"
            SELECT
                id,
                affiliate_id,
                code,
                name,
                target_url,
                created_at
            FROM affiliate_links
            WHERE id = $1
            "#,
        )
        .bind(link_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_links(&self, affiliate_id: Uuid) -> Result<Vec<AffiliateLink>, Error> {
        sqlx::query_as::<_, AffiliateLink>(
            r#"
            SELECT
                id,
                affiliate_id,
                code,
                name,
                target_url,
                created_at
            FROM affiliate_links
            WHERE affiliate_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(affiliate_id)
        .fetch_all(&self.pool)
        .await
    }
}
