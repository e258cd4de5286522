//! Withdrawal handlers (user-facing side of the verification gate)

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::handlers::client_meta;
use crate::models::{ApiResponse, WithdrawalRequest};
use crate::services::withdrawal_service::NewWithdrawal;

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitWithdrawalRequest {
    #[validate(range(min = 0.01, message = "must be positive"))]
    pub amount: f64,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub method: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub destination: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitCodeRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub code: String,
}

pub async fn submit_withdrawal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    headers: HeaderMap,
    Json(request): Json<SubmitWithdrawalRequest>,
) -> ApiResult<Json<ApiResponse<WithdrawalRequest>>> {
    request.validate()?;

    let (request_ip, request_user_agent) = client_meta(&headers);
    let created = state
        .withdrawal_service
        .submit(
            user.id,
            NewWithdrawal {
                amount: request.amount,
                method: request.method,
                destination: request.destination,
                request_ip,
                request_user_agent,
            },
        )
        .await?;

    Ok(Json(ApiResponse::ok(created)))
}

pub async fn my_withdrawals(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<WithdrawalRequest>>>> {
    let requests = state.withdrawal_service.list_for_user(user.id).await?;
    Ok(Json(ApiResponse::ok(requests)))
}

/// Submit the verification code for the stage the withdrawal is waiting on.
pub async fn submit_code(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitCodeRequest>,
) -> ApiResult<Json<ApiResponse<WithdrawalRequest>>> {
    request.validate()?;
    let updated = state
        .withdrawal_service
        .submit_code(id, user.id, &request.code)
        .await?;
    Ok(Json(ApiResponse::ok(updated)))
}
