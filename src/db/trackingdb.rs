// db/trackingdb.rs
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;
use sqlx::{Error, Row};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::trackingmodels::*;

/// Everything needed to persist a conversion. The affiliate id and the
/// commission figures are resolved by the recorder before the write.
#[derive(Debug, Clone)]
pub struct NewConversion {
    pub click_id: Uuid,
    pub affiliate_id: Uuid,
    pub converting_user_id: Option<Uuid>,
    pub amount_cents: i64,
    pub commission_cents: i64,
    pub commission_rate: i32,
    pub conversion_type: ConversionType,
}

/// Outcome of the transactional conversion write.
#[derive(Debug)]
pub enum ConversionWrite {
    /// Conversion persisted and the affiliate credited, atomically.
    Inserted {
        conversion: Conversion,
        new_balance_cents: i64,
    },
    /// A conversion already exists for this (click, type) pair; nothing was
    /// written and no balance changed.
    Duplicate(Conversion),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TrafficStats {
    pub total_clicks: i64,
    pub total_conversions: i64,
    pub total_commission_cents: i64,
}

#[async_trait]
pub trait TrackingStore {
    async fn insert_click(
        &self,
        link_id: Uuid,
        cookie_id: &str,
        visitor_ip: Option<&str>,
        referrer: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<Click, Error>;

    /// Look up a click by its attribution token, ignoring clicks older than
    /// the validity window.
    async fn get_click_by_cookie(
        &self,
        cookie_id: &str,
        within_days: i32,
    ) -> Result<Option<Click>, Error>;

    /// The click a user was first attributed through, resolved via their
    /// earliest recorded conversion. Used by the webhook path, which never
    /// trusts a token from the payload.
    async fn get_attributed_click_for_user(&self, user_id: Uuid)
        -> Result<Option<Click>, Error>;

    async fn get_conversion(
        &self,
        click_id: Uuid,
        conversion_type: ConversionType,
    ) -> Result<Option<Conversion>, Error>;

    /// Persist the conversion and credit the affiliate in one transaction.
    /// The credit is a single server-side `balance = balance + x` update, so
    /// concurrent conversions for the same affiliate cannot lose credits.
    async fn record_conversion_with_credit(
        &self,
        new: NewConversion,
    ) -> Result<ConversionWrite, Error>;

    async fn affiliate_traffic_stats(&self, affiliate_id: Uuid) -> Result<TrafficStats, Error>;
}

#[async_trait]
impl TrackingStore for DBClient {
    async fn insert_click(
        &self,
        link_id: Uuid,
        cookie_id: &str,
        visitor_ip: Option<&str>,
        referrer: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<Click, Error> {
        sqlx::query_as::<_, Click>(
            r#"
            INSERT INTO clicks (link_id, cookie_id, visitor_ip, referrer, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING
                id,
                link_id,
                cookie_id,
                visitor_ip,
                referrer,
                user_agent,
                created_at
            "#,
        )
        .bind(link_id)
        .bind(cookie_id)
        .bind(visitor_ip)
        .bind(referrer)
        .bind(user_agent)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_click_by_cookie(
        &self,
        cookie_id: &str,
        within_days: i32,
    ) -> Result<Option<Click>, Error> {
        sqlx::query_as::<_, Click>(
            r#"
            SELECT
                id,
                link_id,
                cookie_id,
                visitor_ip,
                referrer,
                user_agent,
                created_at
            FROM clicks
            WHERE cookie_id = $1
              AND created_at > NOW() - make_interval(days => $2)
            "#,
        )
        .bind(cookie_id)
        .bind(within_days)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_attributed_click_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Click>, Error> {
        sqlx::query_as::<_, Click>(
            r#"
            SELECT
                cl.id,
                cl.link_id,
                cl.cookie_id,
                cl.visitor_ip,
                cl.referrer,
                cl.user_agent,
                cl.created_at
            FROM clicks cl
            JOIN conversions cv ON cv.click_id = cl.id
            WHERE cv.converting_user_id = $1
            ORDER BY cv.created_at ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_conversion(
        &self,
        click_id: Uuid,
        conversion_type: ConversionType,
    ) -> Result<Option<Conversion>, Error> {
        sqlx::query_as::<_, Conversion>(
            r#"
            SELECT
                id,
                click_id,
                converting_user_id,
                amount_cents,
                commission_cents,
                commission_rate,
                conversion_type,
                status,
                created_at
            FROM conversions
            WHERE click_id = $1 AND conversion_type = $2
            "#,
        )
        .bind(click_id)
        .bind(conversion_type)
        .fetch_optional(&self.pool)
        .await
    }

    async fn record_conversion_with_credit(
        &self,
        new: NewConversion,
    ) -> Result<ConversionWrite, Error> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, Conversion>(
            r#"
            INSERT INTO conversions
            (click_id, converting_user_id, amount_cents, commission_cents,
             commission_rate, conversion_type, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'completed'::conversion_status)
            ON CONFLICT (click_id, conversion_type) DO NOTHING
            RETURNING
                id,
                click_id,
                converting_user_id,
                amount_cents,
                commission_cents,
                commission_rate,
                conversion_type,
                status,
                created_at
            "#,
        )
        .bind(new.click_id)
        .bind(new.converting_user_id)
        .bind(new.amount_cents)
        .bind(new.commission_cents)
        .bind(new.commission_rate)
        .bind(new.conversion_type)
        .fetch_optional(&mut *tx)
        .await?;

        let conversion = match inserted {
            Some(conversion) => conversion,
            None => {
                // Lost the race (or a straight redelivery). Surface the
                // existing row; the balance was credited by whoever won.
                drop(tx);
                let existing = self
                    .get_conversion(new.click_id, new.conversion_type)
                    .await?
                    .ok_or(Error::RowNotFound)?;
                return Ok(ConversionWrite::Duplicate(existing));
            }
        };

        let row = sqlx::query(
            r#"
            UPDATE affiliates
            SET balance_cents = balance_cents + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING balance_cents
            "#,
        )
        .bind(new.affiliate_id)
        .bind(new.commission_cents)
        .fetch_one(&mut *tx)
        .await?;

        let new_balance_cents = row.get::<i64, _>("balance_cents");

        tx.commit().await?;
        Ok(ConversionWrite::Inserted {
            conversion,
            new_balance_cents,
        })
    }

    async fn affiliate_traffic_stats(&self, affiliate_id: Uuid) -> Result<TrafficStats, Error> {
        let clicks = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM clicks cl
            JOIN affiliate_links l ON cl.link_id = l.id
            WHERE l.affiliate_id = $1
            "#,
        )
        .bind(affiliate_id)
        .fetch_one(&self.pool)
        .await?;

        let conversions = sqlx::query(
            r#"
            SELECT COUNT(*) AS total, COALESCE(SUM(cv.commission_cents), 0) AS commission
            FROM conversions cv
            JOIN clicks cl ON cv.click_id = cl.id
            JOIN affiliate_links l ON cl.link_id = l.id
            WHERE l.affiliate_id = $1 AND cv.status = 'completed'
            "#,
        )
        .bind(affiliate_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(TrafficStats {
            total_clicks: clicks.get::<i64, _>("total"),
            total_conversions: conversions.get::<i64, _>("total"),
            total_commission_cents: conversions
                .get::<Option<BigDecimal>, _>("commission")
                .and_then(|bd| bd.to_i64())
                .unwrap_or(0),
        })
    }
}
