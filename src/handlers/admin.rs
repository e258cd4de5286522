//! Admin handlers: moderation queues, user management, platform stats

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::models::{
    ApiResponse, PaginationParams, PaymentRequest, PlanTier, Referral, ReferralStatus,
    RequestStatus, User, UserRole, WithdrawalRequest, WithdrawalStatus,
};
use crate::services::user_service::{AdminUserUpdate, UserListFilter};

#[derive(Debug, Serialize)]
pub struct PlatformStats {
    pub active_users: i64,
    pub active_picks: i64,
    pub pending_payments: i64,
    pub open_withdrawals: i64,
    pub total_revenue: f64,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i32>,
    pub limit: Option<i32>,
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub plan: Option<PlanTier>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub role: Option<UserRole>,
    pub plan: Option<PlanTier>,
    pub plan_expiry: Option<Option<DateTime<Utc>>>,
    pub balance: Option<f64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery<T> {
    pub status: Option<T>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RejectRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub reason: String,
}

// ===== Stats =====

pub async fn stats(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<ApiResponse<PlatformStats>>> {
    let stats = PlatformStats {
        active_users: state.user_service.count_active().await?,
        active_picks: state.pick_service.count_active().await?,
        pending_payments: state.payment_service.pending_count().await?,
        open_withdrawals: state.withdrawal_service.pending_count().await?,
        total_revenue: state.payment_service.total_revenue().await?,
    };
    Ok(Json(ApiResponse::ok(stats)))
}

// ===== Users =====

pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<ApiResponse<Vec<User>>>> {
    let (limit, offset) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .limit_offset();

    let users = state
        .user_service
        .list(
            UserListFilter {
                search: query.search,
                role: query.role,
                plan: query.plan,
                is_active: query.is_active,
            },
            limit,
            offset,
        )
        .await?;

    Ok(Json(ApiResponse::ok(users)))
}

pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AdminUpdateUserRequest>,
) -> ApiResult<Json<ApiResponse<User>>> {
    let user = state
        .user_service
        .admin_update(
            id,
            AdminUserUpdate {
                role: request.role,
                plan: request.plan,
                plan_expiry: request.plan_expiry,
                balance: request.balance,
                is_active: request.is_active,
            },
        )
        .await?;
    Ok(Json(ApiResponse::ok(user)))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    state.user_service.deactivate(id).await?;
    Ok(Json(ApiResponse::ok(serde_json::json!({ "deactivated": id }))))
}

// ===== Payment requests =====

pub async fn list_payments(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<StatusQuery<RequestStatus>>,
) -> ApiResult<Json<ApiResponse<Vec<PaymentRequest>>>> {
    let (limit, offset) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .limit_offset();

    let requests = state
        .payment_service
        .list(query.status, limit, offset)
        .await?;
    Ok(Json(ApiResponse::ok(requests)))
}

pub async fn approve_payment(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<PaymentRequest>>> {
    let request = state.payment_service.approve(id, admin.id).await?;
    Ok(Json(ApiResponse::ok(request)))
}

pub async fn reject_payment(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RejectRequest>,
) -> ApiResult<Json<ApiResponse<PaymentRequest>>> {
    request.validate()?;
    let updated = state
        .payment_service
        .reject(id, admin.id, &request.reason)
        .await?;
    Ok(Json(ApiResponse::ok(updated)))
}

// ===== Withdrawal requests =====

pub async fn list_withdrawals(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<StatusQuery<WithdrawalStatus>>,
) -> ApiResult<Json<ApiResponse<Vec<WithdrawalRequest>>>> {
    let (limit, offset) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .limit_offset();

    let requests = state
        .withdrawal_service
        .list(query.status, limit, offset)
        .await?;
    Ok(Json(ApiResponse::ok(requests)))
}

pub async fn confirm_withdrawal_code(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<WithdrawalRequest>>> {
    let updated = state.withdrawal_service.confirm_code(id, admin.id).await?;
    Ok(Json(ApiResponse::ok(updated)))
}

pub async fn reject_withdrawal_code(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RejectRequest>,
) -> ApiResult<Json<ApiResponse<WithdrawalRequest>>> {
    request.validate()?;
    let updated = state
        .withdrawal_service
        .reject_code(id, admin.id, &request.reason)
        .await?;
    Ok(Json(ApiResponse::ok(updated)))
}

pub async fn process_withdrawal(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<WithdrawalRequest>>> {
    let updated = state
        .withdrawal_service
        .start_processing(id, admin.id)
        .await?;
    Ok(Json(ApiResponse::ok(updated)))
}

pub async fn complete_withdrawal(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<WithdrawalRequest>>> {
    let updated = state.withdrawal_service.complete(id, admin.id).await?;
    Ok(Json(ApiResponse::ok(updated)))
}

pub async fn reject_withdrawal(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RejectRequest>,
) -> ApiResult<Json<ApiResponse<WithdrawalRequest>>> {
    request.validate()?;
    let updated = state
        .withdrawal_service
        .reject(id, admin.id, &request.reason)
        .await?;
    Ok(Json(ApiResponse::ok(updated)))
}

// ===== Referrals =====

pub async fn list_referrals(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<StatusQuery<ReferralStatus>>,
) -> ApiResult<Json<ApiResponse<Vec<Referral>>>> {
    let (limit, offset) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .limit_offset();

    let referrals = state
        .referral_service
        .list_all(query.status, limit, offset)
        .await?;
    Ok(Json(ApiResponse::ok(referrals)))
}

pub async fn mark_referral_paid(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Referral>>> {
    let referral = state.referral_service.mark_paid(id).await?;
    Ok(Json(ApiResponse::ok(referral)))
}
