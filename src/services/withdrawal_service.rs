//! Withdrawal service layer
//!
//! Payout is gated behind two manually-confirmed codes (VAT, then BOT), each
//! following the same exchange: the user submits a code while the request sits
//! in the stage's `_required` status, an admin confirms or rejects it while it
//! sits in `_pending`. Every transition is a conditional update keyed on the
//! exact current status, so concurrent submissions or double confirmations
//! lose cleanly instead of clobbering each other.

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    TransactionType, VerificationStage, WithdrawalRequest, WithdrawalStatus,
};
use crate::services::UserService;

pub struct WithdrawalService {
    db_pool: PgPool,
    user_service: Arc<UserService>,
}

#[derive(Debug)]
pub struct NewWithdrawal {
    pub amount: f64,
    pub method: String,
    pub destination: String,
    pub request_ip: Option<String>,
    pub request_user_agent: Option<String>,
}

impl WithdrawalService {
    pub fn new(db_pool: PgPool, user_service: Arc<UserService>) -> Self {
        Self {
            db_pool,
            user_service,
        }
    }

    pub async fn submit(&self, user_id: Uuid, request: NewWithdrawal) -> ApiResult<WithdrawalRequest> {
        if request.amount <= 0.0 {
            return Err(ApiError::validation("Amount must be positive"));
        }

        let user = self
            .user_service
            .get_by_id(user_id)
            .await?
            .ok_or(ApiError::NotFound("User"))?;
        if user.balance < request.amount {
            return Err(ApiError::validation("Insufficient balance"));
        }

        let now = Utc::now();
        let created = sqlx::query_as::<_, WithdrawalRequest>(
            r#"
            INSERT INTO withdrawal_requests
                (id, user_id, amount, method, destination, status,
                 request_ip, request_user_agent, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'imf_required', $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(request.amount)
        .bind(&request.method)
        .bind(&request.destination)
        .bind(&request.request_ip)
        .bind(&request.request_user_agent)
        .bind(now)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(withdrawal_id = %created.id, amount = created.amount, "withdrawal submitted");
        Ok(created)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> ApiResult<Vec<WithdrawalRequest>> {
        let requests = sqlx::query_as::<_, WithdrawalRequest>(
            "SELECT * FROM withdrawal_requests WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(requests)
    }

    pub async fn list(
        &self,
        status: Option<WithdrawalStatus>,
        limit: i64,
        offset: i64,
    ) -> ApiResult<Vec<WithdrawalRequest>> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM withdrawal_requests WHERE 1=1");

        if let Some(status) = status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let requests = query_builder
            .build_query_as::<WithdrawalRequest>()
            .fetch_all(&self.db_pool)
            .await?;
        Ok(requests)
    }

    async fn get(&self, id: Uuid) -> ApiResult<WithdrawalRequest> {
        let request = sqlx::query_as::<_, WithdrawalRequest>(
            "SELECT * FROM withdrawal_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Withdrawal request"))?;
        Ok(request)
    }

    /// User submits the code for the stage currently awaiting one. Allowed
    /// only while the status is exactly that stage's `_required` state; a
    /// second submission (or a race) fails with ALREADY_SUBMITTED.
    pub async fn submit_code(
        &self,
        id: Uuid,
        user_id: Uuid,
        code: &str,
    ) -> ApiResult<WithdrawalRequest> {
        if code.trim().is_empty() {
            return Err(ApiError::validation("A verification code is required"));
        }

        let request = self.get(id).await?;
        if request.user_id != user_id {
            return Err(ApiError::NotFound("Withdrawal request"));
        }

        let stage = code_submission_stage(request.status)?;

        let now = Utc::now();
        let next = WithdrawalStatus::after_submission(stage);
        let (code_column, at_column) = match stage {
            VerificationStage::Vat => ("vat_code", "vat_submitted_at"),
            VerificationStage::Bot => ("bot_code", "bot_submitted_at"),
        };

        let updated = sqlx::query_as::<_, WithdrawalRequest>(&format!(
            r#"
            UPDATE withdrawal_requests
            SET {code_column} = $3, {at_column} = $4, status = $5, updated_at = $4
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        ))
        .bind(id)
        .bind(request.status)
        .bind(code)
        .bind(now)
        .bind(next)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(ApiError::already_submitted)?;

        tracing::info!(withdrawal_id = %id, stage = ?stage, "verification code submitted");
        Ok(updated)
    }

    /// Admin confirms the submitted code for the stage under review, advancing
    /// the chain (VAT -> bot_required, BOT -> approved).
    pub async fn confirm_code(&self, id: Uuid, admin_id: Uuid) -> ApiResult<WithdrawalRequest> {
        let request = self.get(id).await?;
        let stage = request
            .status
            .stage_awaiting_review()
            .ok_or_else(ApiError::already_processed)?;

        let now = Utc::now();
        let next = WithdrawalStatus::after_confirmation(stage);
        let (at_column, by_column) = match stage {
            VerificationStage::Vat => ("vat_confirmed_at", "vat_confirmed_by"),
            VerificationStage::Bot => ("bot_confirmed_at", "bot_confirmed_by"),
        };

        let updated = sqlx::query_as::<_, WithdrawalRequest>(&format!(
            r#"
            UPDATE withdrawal_requests
            SET {at_column} = $3, {by_column} = $4, status = $5, updated_at = $3
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        ))
        .bind(id)
        .bind(request.status)
        .bind(now)
        .bind(admin_id)
        .bind(next)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(ApiError::already_processed)?;

        tracing::info!(withdrawal_id = %id, stage = ?stage, status = ?updated.status, "stage confirmed");
        Ok(updated)
    }

    /// Admin rejects the submitted code for the stage under review; terminal
    /// for the withdrawal. A reason is required.
    pub async fn reject_code(
        &self,
        id: Uuid,
        admin_id: Uuid,
        reason: &str,
    ) -> ApiResult<WithdrawalRequest> {
        if reason.trim().is_empty() {
            return Err(ApiError::validation("A rejection reason is required"));
        }

        let request = self.get(id).await?;
        let stage = request
            .status
            .stage_awaiting_review()
            .ok_or_else(ApiError::already_processed)?;

        let next = WithdrawalStatus::after_stage_rejection(stage);
        self.finalize_rejection(id, request.status, next, admin_id, reason)
            .await
    }

    /// Move an approved withdrawal into processing.
    pub async fn start_processing(&self, id: Uuid, admin_id: Uuid) -> ApiResult<WithdrawalRequest> {
        self.transition(id, WithdrawalStatus::Approved, WithdrawalStatus::Processing, admin_id)
            .await
    }

    /// Complete a processing withdrawal: debit the balance and write the
    /// ledger entry. The debit is conditional on sufficient funds; the status
    /// flip is conditional on `processing`, and a failed flip refunds.
    pub async fn complete(&self, id: Uuid, admin_id: Uuid) -> ApiResult<WithdrawalRequest> {
        let request = self.get(id).await?;
        if request.status != WithdrawalStatus::Processing {
            return Err(ApiError::already_processed());
        }

        if !self
            .user_service
            .try_debit_balance(request.user_id, request.amount)
            .await?
        {
            return Err(ApiError::conflict(
                "User balance no longer covers this withdrawal",
                "INSUFFICIENT_BALANCE",
            ));
        }

        let completed = self
            .transition(id, WithdrawalStatus::Processing, WithdrawalStatus::Completed, admin_id)
            .await;

        let completed = match completed {
            Ok(r) => r,
            Err(e) => {
                // Lost a race after the debit; put the money back.
                let mut conn = self.db_pool.acquire().await?;
                self.user_service
                    .credit_balance(&mut conn, request.user_id, request.amount)
                    .await?;
                return Err(e);
            }
        };

        sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, tx_type, amount, status, description, created_at)
            VALUES ($1, $2, $3, $4, 'completed', $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(TransactionType::Withdrawal)
        .bind(request.amount)
        .bind(format!("Withdrawal to {}", request.destination))
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await?;

        tracing::info!(withdrawal_id = %id, amount = request.amount, "withdrawal completed");
        Ok(completed)
    }

    /// Admin rejects an approved or processing withdrawal outright.
    pub async fn reject(&self, id: Uuid, admin_id: Uuid, reason: &str) -> ApiResult<WithdrawalRequest> {
        if reason.trim().is_empty() {
            return Err(ApiError::validation("A rejection reason is required"));
        }

        let request = self.get(id).await?;
        if !matches!(
            request.status,
            WithdrawalStatus::Approved | WithdrawalStatus::Processing
        ) {
            return Err(ApiError::already_processed());
        }

        self.finalize_rejection(id, request.status, WithdrawalStatus::Rejected, admin_id, reason)
            .await
    }

    async fn finalize_rejection(
        &self,
        id: Uuid,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
        admin_id: Uuid,
        reason: &str,
    ) -> ApiResult<WithdrawalRequest> {
        let now = Utc::now();
        let updated = sqlx::query_as::<_, WithdrawalRequest>(
            r#"
            UPDATE withdrawal_requests
            SET status = $3, rejection_reason = $4, rejected_at = $5, rejected_by = $6,
                updated_at = $5
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(reason)
        .bind(now)
        .bind(admin_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(ApiError::already_processed)?;

        tracing::info!(withdrawal_id = %id, status = ?updated.status, "withdrawal rejected");
        Ok(updated)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
        admin_id: Uuid,
    ) -> ApiResult<WithdrawalRequest> {
        let now = Utc::now();
        let updated = sqlx::query_as::<_, WithdrawalRequest>(
            r#"
            UPDATE withdrawal_requests
            SET status = $3, processed_by = $4, processed_at = $5, updated_at = $5
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(admin_id)
        .bind(now)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(ApiError::already_processed)?;

        Ok(updated)
    }

    pub async fn pending_count(&self) -> ApiResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM withdrawal_requests
            WHERE status NOT IN ('completed', 'rejected', 'vat_rejected', 'bot_rejected')
            "#,
        )
        .fetch_one(&self.db_pool)
        .await?;
        Ok(count)
    }
}

/// Which stage a user-submitted code applies to in the current status. A
/// `_pending` status means a code is already under admin review.
fn code_submission_stage(status: WithdrawalStatus) -> ApiResult<VerificationStage> {
    if let Some(stage) = status.stage_awaiting_code() {
        return Ok(stage);
    }
    if status.stage_awaiting_review().is_some() {
        return Err(ApiError::already_submitted());
    }
    Err(ApiError::conflict(
        "No verification code is expected in the current state",
        "INVALID_STATE",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict_code(err: ApiError) -> &'static str {
        match err {
            ApiError::Conflict { code, .. } => code,
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn code_submission_targets_the_required_stage() {
        assert_eq!(
            code_submission_stage(WithdrawalStatus::ImfRequired).unwrap(),
            VerificationStage::Vat
        );
        assert_eq!(
            code_submission_stage(WithdrawalStatus::BotRequired).unwrap(),
            VerificationStage::Bot
        );
    }

    #[test]
    fn resubmission_while_under_review_is_already_submitted() {
        for status in [WithdrawalStatus::VatPending, WithdrawalStatus::BotPending] {
            let err = code_submission_stage(status).unwrap_err();
            assert_eq!(conflict_code(err), "ALREADY_SUBMITTED");
        }
    }

    #[test]
    fn settled_and_terminal_states_expect_no_code() {
        for status in [
            WithdrawalStatus::Approved,
            WithdrawalStatus::Processing,
            WithdrawalStatus::Completed,
            WithdrawalStatus::VatRejected,
            WithdrawalStatus::BotRejected,
            WithdrawalStatus::Rejected,
        ] {
            let err = code_submission_stage(status).unwrap_err();
            assert_eq!(conflict_code(err), "INVALID_STATE");
        }
    }
}
