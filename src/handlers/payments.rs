//! Payment request handlers (user-facing side)

use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::{AuthUser, MaybeAuthUser};
use crate::error::{ApiError, ApiResult};
use crate::handlers::client_meta;
use crate::models::{ApiResponse, PaymentKind, PaymentRequest};
use crate::services::payment_service::NewPaymentRequest;

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitPaymentRequest {
    pub kind: PaymentKind,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    pub name: Option<String>,
    pub plan_id: Option<Uuid>,
    #[validate(range(min = 0.01, message = "must be positive"))]
    pub amount: f64,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub method: String,
    pub reference: Option<String>,
    pub referral_code: Option<String>,
}

/// Submit a payment request. Deposits require authentication; subscription
/// requests may come from anonymous visitors who supply an email.
pub async fn submit_payment(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    headers: HeaderMap,
    Json(request): Json<SubmitPaymentRequest>,
) -> ApiResult<Json<ApiResponse<PaymentRequest>>> {
    request.validate()?;

    let (email, user_id, name) = match (&user, &request.email) {
        (Some(u), _) => (u.email.clone(), Some(u.id), Some(u.name.clone())),
        (None, Some(email)) => (email.clone(), None, request.name.clone()),
        (None, None) => {
            return Err(ApiError::validation(
                "email is required for anonymous requests",
            ));
        }
    };

    let (request_ip, request_user_agent) = client_meta(&headers);
    let created = state
        .payment_service
        .submit(NewPaymentRequest {
            user_id,
            email,
            name,
            kind: request.kind,
            plan_id: request.plan_id,
            amount: request.amount,
            method: request.method,
            reference: request.reference,
            referral_code: request.referral_code,
            request_ip,
            request_user_agent,
        })
        .await?;

    Ok(Json(ApiResponse::ok(created)))
}

pub async fn my_payments(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<PaymentRequest>>>> {
    let requests = state.payment_service.list_for_user(user.id).await?;
    Ok(Json(ApiResponse::ok(requests)))
}
