//! Payment request service layer
//!
//! The submit -> admin review -> approve/reject lifecycle. Approval runs as
//! one database transaction: the conditional status flip on
//! `status = 'pending'` and every side effect (plan activation, balance
//! credit, ledger entry, referral earnings) commit together or not at all.
//! The loser of a concurrent double-process sees ALREADY_PROCESSED and no
//! side effect runs twice; a failed side effect rolls the status flip back.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    PaymentKind, PaymentRequest, ReferralType, RequestStatus, TransactionType, User,
};
use crate::services::{EmailService, PlanService, ReferralService, UserService};

pub struct PaymentService {
    db_pool: PgPool,
    user_service: Arc<UserService>,
    plan_service: Arc<PlanService>,
    referral_service: Arc<ReferralService>,
    email_service: Arc<EmailService>,
}

/// A new payment request. Subscription requests may arrive before the account
/// exists; deposits always belong to an authenticated user.
#[derive(Debug)]
pub struct NewPaymentRequest {
    pub user_id: Option<Uuid>,
    pub email: String,
    pub name: Option<String>,
    pub kind: PaymentKind,
    pub plan_id: Option<Uuid>,
    pub amount: f64,
    pub method: String,
    pub reference: Option<String>,
    pub referral_code: Option<String>,
    pub request_ip: Option<String>,
    pub request_user_agent: Option<String>,
}

impl PaymentService {
    pub fn new(
        db_pool: PgPool,
        user_service: Arc<UserService>,
        plan_service: Arc<PlanService>,
        referral_service: Arc<ReferralService>,
        email_service: Arc<EmailService>,
    ) -> Self {
        Self {
            db_pool,
            user_service,
            plan_service,
            referral_service,
            email_service,
        }
    }

    pub async fn submit(&self, request: NewPaymentRequest) -> ApiResult<PaymentRequest> {
        match request.kind {
            PaymentKind::Subscription => {
                let plan_id = request
                    .plan_id
                    .ok_or_else(|| ApiError::validation("plan_id is required for subscriptions"))?;
                let plan = self.plan_service.get(plan_id).await?;
                if !plan.is_active {
                    return Err(ApiError::validation("Plan is no longer available"));
                }
            }
            PaymentKind::Deposit => {
                if request.user_id.is_none() {
                    return Err(ApiError::Auth("Deposits require a logged-in user".to_string()));
                }
            }
        }

        // Link an existing account by email when the caller is anonymous.
        let user_id = match request.user_id {
            Some(id) => Some(id),
            None => self
                .user_service
                .get_by_email(&request.email)
                .await?
                .map(|u| u.id),
        };

        let now = Utc::now();
        let created = sqlx::query_as::<_, PaymentRequest>(
            r#"
            INSERT INTO payment_requests
                (id, user_id, email, name, kind, plan_id, amount, method, reference,
                 referral_code, status, request_ip, request_user_agent, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', $11, $12, $13, $13)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&request.email)
        .bind(&request.name)
        .bind(request.kind)
        .bind(request.plan_id)
        .bind(request.amount)
        .bind(&request.method)
        .bind(&request.reference)
        .bind(&request.referral_code)
        .bind(&request.request_ip)
        .bind(&request.request_user_agent)
        .bind(now)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(request_id = %created.id, kind = ?created.kind, "payment request submitted");
        Ok(created)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> ApiResult<Vec<PaymentRequest>> {
        let requests = sqlx::query_as::<_, PaymentRequest>(
            "SELECT * FROM payment_requests WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(requests)
    }

    pub async fn list(
        &self,
        status: Option<RequestStatus>,
        limit: i64,
        offset: i64,
    ) -> ApiResult<Vec<PaymentRequest>> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM payment_requests WHERE 1=1");

        if let Some(status) = status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let requests = query_builder
            .build_query_as::<PaymentRequest>()
            .fetch_all(&self.db_pool)
            .await?;
        Ok(requests)
    }

    /// Approve a pending request and apply its side effects exactly once,
    /// atomically with the status flip.
    pub async fn approve(&self, id: Uuid, admin_id: Uuid) -> ApiResult<PaymentRequest> {
        let mut tx = self.db_pool.begin().await?;
        let request = self
            .claim(&mut tx, id, RequestStatus::Approved, admin_id, None)
            .await?;

        match request.kind {
            PaymentKind::Subscription => self.apply_subscription(&mut tx, &request).await?,
            PaymentKind::Deposit => self.apply_deposit(&mut tx, &request).await?,
        }
        tx.commit().await?;

        self.email_service.send_payment_decision(&request.email, true);
        Ok(request)
    }

    /// Reject a pending request. A reason is required.
    pub async fn reject(&self, id: Uuid, admin_id: Uuid, reason: &str) -> ApiResult<PaymentRequest> {
        if reason.trim().is_empty() {
            return Err(ApiError::validation("A rejection reason is required"));
        }

        let mut tx = self.db_pool.begin().await?;
        let request = self
            .claim(&mut tx, id, RequestStatus::Rejected, admin_id, Some(reason))
            .await?;
        tx.commit().await?;

        self.email_service.send_payment_decision(&request.email, false);
        Ok(request)
    }

    /// Conditional status flip from `pending`. Returns ALREADY_PROCESSED when
    /// the row exists but was not pending anymore.
    async fn claim(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        to: RequestStatus,
        admin_id: Uuid,
        reason: Option<&str>,
    ) -> ApiResult<PaymentRequest> {
        let now = Utc::now();
        let request = sqlx::query_as::<_, PaymentRequest>(
            r#"
            UPDATE payment_requests
            SET status = $2, processed_by = $3, processed_at = $4,
                rejection_reason = $5, updated_at = $4
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(to)
        .bind(admin_id)
        .bind(now)
        .bind(reason)
        .fetch_optional(&mut *conn)
        .await?;

        match request {
            Some(r) => Ok(r),
            None => {
                let found: Option<(RequestStatus,)> =
                    sqlx::query_as("SELECT status FROM payment_requests WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&mut *conn)
                        .await?;
                Err(claim_miss(found.map(|(status,)| status)))
            }
        }
    }

    async fn apply_subscription(
        &self,
        conn: &mut PgConnection,
        request: &PaymentRequest,
    ) -> ApiResult<()> {
        let plan_id = request
            .plan_id
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("subscription request without plan")))?;
        let plan = self.plan_service.get(plan_id).await?;

        let user = self.resolve_or_create_user(conn, request, &plan).await?;

        self.user_service
            .activate_plan(conn, user.id, plan.tier, plan.duration_days)
            .await?;

        self.record_transaction(
            conn,
            user.id,
            TransactionType::Subscription,
            request.amount,
            &format!("Subscription: {}", plan.name),
        )
        .await?;

        if let Some(referrer_id) = user.referred_by {
            self.referral_service
                .record_in(
                    conn,
                    referrer_id,
                    user.id,
                    ReferralType::SubscriptionCommission,
                    request.amount,
                )
                .await?;
            self.referral_service
                .activate_signup_bonus(conn, user.id)
                .await?;
        }

        tracing::info!(user_id = %user.id, plan = %plan.name, "subscription activated");
        Ok(())
    }

    async fn apply_deposit(
        &self,
        conn: &mut PgConnection,
        request: &PaymentRequest,
    ) -> ApiResult<()> {
        let user_id = request
            .user_id
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("deposit request without user")))?;
        let user = self
            .user_service
            .get_by_id(user_id)
            .await?
            .ok_or(ApiError::NotFound("User"))?;

        self.user_service
            .credit_balance(conn, user_id, request.amount)
            .await?;
        self.record_transaction(
            conn,
            user_id,
            TransactionType::Deposit,
            request.amount,
            "Deposit approved",
        )
        .await?;

        if let Some(referrer_id) = user.referred_by {
            self.referral_service
                .record_in(conn, referrer_id, user_id, ReferralType::DepositBonus, request.amount)
                .await?;
        }

        Ok(())
    }

    /// Find the paying user, or create the account the request was submitted
    /// for. New accounts get a generated password mailed to them.
    async fn resolve_or_create_user(
        &self,
        conn: &mut PgConnection,
        request: &PaymentRequest,
        plan: &crate::models::Plan,
    ) -> ApiResult<User> {
        if let Some(user_id) = request.user_id {
            return self
                .user_service
                .get_by_id(user_id)
                .await?
                .ok_or(ApiError::NotFound("User"));
        }
        if let Some(user) = self.user_service.get_by_email(&request.email).await? {
            return Ok(user);
        }

        let referred_by = match request.referral_code.as_deref() {
            Some(code) => self
                .user_service
                .find_by_referral_code(code)
                .await?
                .map(|u| u.id),
            None => None,
        };

        let name = request.name.as_deref().unwrap_or(&request.email);
        let expiry = Utc::now() + chrono::Duration::days(plan.duration_days as i64);
        let (user, password) = self
            .user_service
            .create_subscribed_user(conn, &request.email, name, plan.tier, expiry, referred_by)
            .await?;

        self.email_service
            .send_account_created(&user.email, &user.name, &password);

        // Back-link the request so it shows up in the new user's history.
        sqlx::query("UPDATE payment_requests SET user_id = $2, updated_at = $3 WHERE id = $1")
            .bind(request.id)
            .bind(user.id)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

        Ok(user)
    }

    async fn record_transaction(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        tx_type: TransactionType,
        amount: f64,
        description: &str,
    ) -> ApiResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, tx_type, amount, status, description, created_at)
            VALUES ($1, $2, $3, $4, 'completed', $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(tx_type)
        .bind(amount)
        .bind(description)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn list_transactions(&self, user_id: Uuid) -> ApiResult<Vec<crate::models::Transaction>> {
        let transactions = sqlx::query_as::<_, crate::models::Transaction>(
            "SELECT * FROM transactions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(transactions)
    }

    pub async fn pending_count(&self) -> ApiResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM payment_requests WHERE status = 'pending'",
        )
        .fetch_one(&self.db_pool)
        .await?;
        Ok(count)
    }

    /// Total of approved subscription payments.
    pub async fn total_revenue(&self) -> ApiResult<f64> {
        let (total,): (Option<f64>,) = sqlx::query_as(
            r#"
            SELECT SUM(amount) FROM payment_requests
            WHERE status = 'approved' AND kind = 'subscription'
            "#,
        )
        .fetch_one(&self.db_pool)
        .await?;
        Ok(total.unwrap_or(0.0))
    }
}

/// Error for a claim whose conditional update matched no pending row.
fn claim_miss(found: Option<RequestStatus>) -> ApiError {
    match found {
        Some(_) => ApiError::already_processed(),
        None => ApiError::NotFound("Payment request"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_of_a_processed_request_conflicts() {
        for status in [
            RequestStatus::Approved,
            RequestStatus::Rejected,
            RequestStatus::Processing,
        ] {
            match claim_miss(Some(status)) {
                ApiError::Conflict { code, .. } => assert_eq!(code, "ALREADY_PROCESSED"),
                other => panic!("unexpected variant: {:?}", other),
            }
        }
    }

    #[test]
    fn claim_of_a_missing_request_is_not_found() {
        assert!(matches!(claim_miss(None), ApiError::NotFound(_)));
    }
}
