//! Referral service layer - earnings records and referrer balances

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Referral, ReferralStatus, ReferralType};
use crate::services::referral;

pub struct ReferralService {
    db_pool: PgPool,
}

impl ReferralService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Record one referral event and credit the referrer's pending earnings
    /// in one transaction. The earnings amount comes from the fixed formula,
    /// never the caller.
    pub async fn record(
        &self,
        referrer_id: Uuid,
        referred_user_id: Uuid,
        earnings_type: ReferralType,
        source_amount: f64,
    ) -> ApiResult<Referral> {
        let mut tx = self.db_pool.begin().await?;
        let record = self
            .record_in(&mut tx, referrer_id, referred_user_id, earnings_type, source_amount)
            .await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Same as `record`, but enlisted in the caller's transaction.
    pub async fn record_in(
        &self,
        conn: &mut PgConnection,
        referrer_id: Uuid,
        referred_user_id: Uuid,
        earnings_type: ReferralType,
        source_amount: f64,
    ) -> ApiResult<Referral> {
        let earned = referral::earnings(earnings_type, source_amount);
        let now = Utc::now();

        let record = sqlx::query_as::<_, Referral>(
            r#"
            INSERT INTO referrals
                (id, referrer_id, referred_user_id, earnings_type, source_amount,
                 earnings, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(referrer_id)
        .bind(referred_user_id)
        .bind(earnings_type)
        .bind(source_amount)
        .bind(earned)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            UPDATE users SET
                referral_total = referral_total + $2,
                referral_pending = referral_pending + $2,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(referrer_id)
        .bind(earned)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(record)
    }

    /// Activate the referred user's pending signup bonus, if any. Called when
    /// their first subscription is approved, on the approval's transaction.
    pub async fn activate_signup_bonus(
        &self,
        conn: &mut PgConnection,
        referred_user_id: Uuid,
    ) -> ApiResult<()> {
        sqlx::query(
            r#"
            UPDATE referrals SET status = 'active', updated_at = $2
            WHERE referred_user_id = $1
              AND earnings_type = 'signup_bonus'
              AND status = 'pending'
            "#,
        )
        .bind(referred_user_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn list_for_referrer(&self, referrer_id: Uuid) -> ApiResult<Vec<Referral>> {
        let records = sqlx::query_as::<_, Referral>(
            "SELECT * FROM referrals WHERE referrer_id = $1 ORDER BY created_at DESC",
        )
        .bind(referrer_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(records)
    }

    pub async fn list_all(
        &self,
        status: Option<ReferralStatus>,
        limit: i64,
        offset: i64,
    ) -> ApiResult<Vec<Referral>> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM referrals WHERE 1=1");

        if let Some(status) = status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let records = query_builder
            .build_query_as::<Referral>()
            .fetch_all(&self.db_pool)
            .await?;
        Ok(records)
    }

    /// Mark a referral paid out and move the amount from the referrer's
    /// pending bucket to paid, in one transaction. Conditional on the current
    /// status so paying the same record twice fails instead of
    /// double-settling.
    pub async fn mark_paid(&self, id: Uuid) -> ApiResult<Referral> {
        let mut tx = self.db_pool.begin().await?;
        let record = sqlx::query_as::<_, Referral>(
            r#"
            UPDATE referrals SET status = 'paid', updated_at = $2
            WHERE id = $1 AND status IN ('pending', 'active')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        let record = match record {
            Some(r) => r,
            None => {
                return match self.get(id).await? {
                    Some(_) => Err(ApiError::already_processed()),
                    None => Err(ApiError::NotFound("Referral")),
                };
            }
        };

        sqlx::query(
            r#"
            UPDATE users SET
                referral_pending = referral_pending - $2,
                referral_paid = referral_paid + $2,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(record.referrer_id)
        .bind(record.earnings)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(record)
    }

    async fn get(&self, id: Uuid) -> ApiResult<Option<Referral>> {
        let record = sqlx::query_as::<_, Referral>("SELECT * FROM referrals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(record)
    }
}
