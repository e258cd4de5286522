//! Data models for the PickVault backend

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::types::{
    chrono::{DateTime, Utc},
    Json,
};
use uuid::Uuid;

/// User roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

/// Subscription plan tiers
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "plan_tier", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Silver,
    Gold,
}

/// Content access levels carried by picks and announcements
#[derive(
    Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, PartialOrd, Ord,
)]
#[sqlx(type_name = "access_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Free,
    Silver,
    Gold,
}

impl sqlx::postgres::PgHasArrayType for AccessLevel {
    fn array_type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("_access_level")
    }
}

/// User model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub plan: PlanTier,
    pub plan_expiry: Option<DateTime<Utc>>,
    pub balance: f64,
    pub referral_code: String,
    pub referred_by: Option<Uuid>,
    pub referral_total: f64,
    pub referral_pending: f64,
    pub referral_paid: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Transient registration record awaiting OTP confirmation.
/// Evicted by the TTL sweeper once `expires_at` passes.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct PendingRegistration {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub otp_code: String,
    pub referral_code: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Password reset code record, same TTL handling as pending registrations.
#[derive(Debug, sqlx::FromRow)]
pub struct PasswordReset {
    pub id: Uuid,
    pub email: String,
    pub reset_code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Pick result status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "pick_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PickStatus {
    Pending,
    Won,
    Lost,
    Void,
    Postponed,
}

/// Sports pick model. `odds` maps outcome name to decimal odds; the
/// `potential_return` column always equals `stake * odds[prediction]`.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Pick {
    pub id: Uuid,
    pub sport: String,
    pub event_name: String,
    pub event_time: DateTime<Utc>,
    pub prediction: String,
    pub odds: Json<HashMap<String, f64>>,
    pub stake: f64,
    pub potential_return: f64,
    pub analysis: Option<String>,
    pub access_level: AccessLevel,
    pub status: PickStatus,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Plan catalog entry
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub tier: PlanTier,
    pub price: f64,
    pub duration_days: i32,
    pub features: Json<Vec<String>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin-moderated request status (payment requests)
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Processing,
}

/// What a payment request pays for
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Subscription,
    Deposit,
}

/// Payment request model. `user_id` is nullable: a subscription request may be
/// submitted before the account exists, in which case approval creates the user
/// from `email`/`name`.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentRequest {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub name: Option<String>,
    pub kind: PaymentKind,
    pub plan_id: Option<Uuid>,
    pub amount: f64,
    pub method: String,
    pub reference: Option<String>,
    pub referral_code: Option<String>,
    pub status: RequestStatus,
    pub rejection_reason: Option<String>,
    pub processed_by: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
    pub request_ip: Option<String>,
    pub request_user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Transaction types
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Referral,
    Subscription,
}

/// Transaction status; only `completed` entries count as settled
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// Ledger entry model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tx_type: TransactionType,
    pub amount: f64,
    pub status: TransactionStatus,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Withdrawal verification chain status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "withdrawal_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    ImfRequired,
    VatPending,
    VatRejected,
    BotRequired,
    BotPending,
    BotRejected,
    Approved,
    Processing,
    Completed,
    Rejected,
}

/// The two manually-confirmed verification stages of a withdrawal
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStage {
    Vat,
    Bot,
}

impl WithdrawalStatus {
    /// The stage whose code the user may submit right now, if any.
    pub fn stage_awaiting_code(self) -> Option<VerificationStage> {
        match self {
            WithdrawalStatus::ImfRequired => Some(VerificationStage::Vat),
            WithdrawalStatus::BotRequired => Some(VerificationStage::Bot),
            _ => None,
        }
    }

    /// The stage whose submitted code an admin may confirm or reject, if any.
    pub fn stage_awaiting_review(self) -> Option<VerificationStage> {
        match self {
            WithdrawalStatus::VatPending => Some(VerificationStage::Vat),
            WithdrawalStatus::BotPending => Some(VerificationStage::Bot),
            _ => None,
        }
    }

    /// Status after the user submits the code for the current stage.
    pub fn after_submission(stage: VerificationStage) -> WithdrawalStatus {
        match stage {
            VerificationStage::Vat => WithdrawalStatus::VatPending,
            VerificationStage::Bot => WithdrawalStatus::BotPending,
        }
    }

    /// Status after the admin confirms the submitted code for a stage.
    pub fn after_confirmation(stage: VerificationStage) -> WithdrawalStatus {
        match stage {
            VerificationStage::Vat => WithdrawalStatus::BotRequired,
            VerificationStage::Bot => WithdrawalStatus::Approved,
        }
    }

    /// Terminal status after the admin rejects the submitted code for a stage.
    pub fn after_stage_rejection(stage: VerificationStage) -> WithdrawalStatus {
        match stage {
            VerificationStage::Vat => WithdrawalStatus::VatRejected,
            VerificationStage::Bot => WithdrawalStatus::BotRejected,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WithdrawalStatus::VatRejected
                | WithdrawalStatus::BotRejected
                | WithdrawalStatus::Completed
                | WithdrawalStatus::Rejected
        )
    }
}

/// Withdrawal request model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub method: String,
    pub destination: String,
    pub status: WithdrawalStatus,
    pub vat_code: Option<String>,
    pub vat_submitted_at: Option<DateTime<Utc>>,
    pub vat_confirmed_at: Option<DateTime<Utc>>,
    pub vat_confirmed_by: Option<Uuid>,
    pub bot_code: Option<String>,
    pub bot_submitted_at: Option<DateTime<Utc>>,
    pub bot_confirmed_at: Option<DateTime<Utc>>,
    pub bot_confirmed_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub processed_by: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
    pub request_ip: Option<String>,
    pub request_user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Referral earnings types
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "referral_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReferralType {
    SignupBonus,
    SubscriptionCommission,
    DepositBonus,
}

/// Referral record status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "referral_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Pending,
    Active,
    Paid,
    Cancelled,
}

/// Referral earnings record for one (referrer, referred user) event
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Referral {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_user_id: Uuid,
    pub earnings_type: ReferralType,
    pub source_amount: f64,
    pub earnings: f64,
    pub status: ReferralStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Announcement model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub audience: AccessLevel,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Support ticket status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Answered,
    Closed,
}

/// One entry in a ticket's response thread
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TicketResponse {
    pub author_id: Uuid,
    pub author_role: UserRole,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Support ticket model with an embedded response thread
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct SupportTicket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub message: String,
    pub status: TicketStatus,
    pub responses: Json<Vec<TicketResponse>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contact inquiry model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContactInquiry {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// CMS document (homepage content / dashboard config)
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CmsDocument {
    pub id: Uuid,
    pub content: Json<serde_json::Value>,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Pagination parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

impl PaginationParams {
    /// Clamped (limit, offset) pair; limit capped at 100.
    pub fn limit_offset(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1) as i64;
        let limit = self.limit.unwrap_or(20).clamp(1, 100) as i64;
        (limit, (page - 1) * limit)
    }
}

/// Compute the potential return of a pick. Idempotent in its inputs: the same
/// stake, odds table and prediction always yield the same value. Unknown
/// predictions return zero rather than failing, matching a void pick payout.
pub fn potential_return(stake: f64, odds: &HashMap<String, f64>, prediction: &str) -> f64 {
    let factor = odds.get(prediction).copied().unwrap_or(0.0);
    crate::services::referral::round_cents(stake * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn odds(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn potential_return_uses_predicted_outcome_odds() {
        let o = odds(&[("home", 1.85), ("draw", 3.4), ("away", 4.2)]);
        assert_eq!(potential_return(100.0, &o, "home"), 185.0);
        assert_eq!(potential_return(100.0, &o, "away"), 420.0);
    }

    #[test]
    fn potential_return_is_idempotent() {
        let o = odds(&[("over", 1.95)]);
        let first = potential_return(50.0, &o, "over");
        let again = potential_return(50.0, &o, "over");
        assert_eq!(first, again);
    }

    #[test]
    fn potential_return_unknown_prediction_is_zero() {
        let o = odds(&[("home", 2.0)]);
        assert_eq!(potential_return(100.0, &o, "under"), 0.0);
    }

    #[test]
    fn withdrawal_chain_advances_through_both_stages() {
        let start = WithdrawalStatus::ImfRequired;
        let stage = start.stage_awaiting_code().unwrap();
        assert_eq!(stage, VerificationStage::Vat);

        let pending = WithdrawalStatus::after_submission(stage);
        assert_eq!(pending, WithdrawalStatus::VatPending);
        assert_eq!(pending.stage_awaiting_code(), None);

        let review = pending.stage_awaiting_review().unwrap();
        let next = WithdrawalStatus::after_confirmation(review);
        assert_eq!(next, WithdrawalStatus::BotRequired);

        let stage = next.stage_awaiting_code().unwrap();
        assert_eq!(stage, VerificationStage::Bot);
        let pending = WithdrawalStatus::after_submission(stage);
        assert_eq!(pending, WithdrawalStatus::BotPending);
        let done = WithdrawalStatus::after_confirmation(pending.stage_awaiting_review().unwrap());
        assert_eq!(done, WithdrawalStatus::Approved);
    }

    #[test]
    fn stage_rejections_are_terminal() {
        assert!(WithdrawalStatus::after_stage_rejection(VerificationStage::Vat).is_terminal());
        assert!(WithdrawalStatus::after_stage_rejection(VerificationStage::Bot).is_terminal());
        assert!(!WithdrawalStatus::Approved.is_terminal());
        assert!(!WithdrawalStatus::Processing.is_terminal());
    }
}
