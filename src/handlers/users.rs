//! User profile handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::models::{ApiResponse, Referral, Transaction, User};

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct ReferralSummary {
    pub referral_code: String,
    pub total: f64,
    pub pending: f64,
    pub paid: f64,
    pub referrals: Vec<Referral>,
}

pub async fn get_profile(AuthUser(user): AuthUser) -> Json<ApiResponse<User>> {
    Json(ApiResponse::ok(user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ApiResponse<User>>> {
    request.validate()?;
    let updated = state
        .user_service
        .update_profile(user.id, &request.name)
        .await?;
    Ok(Json(ApiResponse::ok(updated)))
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    request.validate()?;
    state
        .user_service
        .change_password(user.id, &request.current_password, &request.new_password)
        .await?;
    Ok(Json(ApiResponse::ok(serde_json::json!({
        "message": "Password updated"
    }))))
}

pub async fn my_referrals(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<ApiResponse<ReferralSummary>>> {
    let referrals = state.referral_service.list_for_referrer(user.id).await?;
    Ok(Json(ApiResponse::ok(ReferralSummary {
        referral_code: user.referral_code,
        total: user.referral_total,
        pending: user.referral_pending,
        paid: user.referral_paid,
        referrals,
    })))
}

pub async fn my_transactions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<Transaction>>>> {
    let transactions = state.payment_service.list_transactions(user.id).await?;
    Ok(Json(ApiResponse::ok(transactions)))
}
