//! Authentication handlers: registration, OTP verification, login, tokens

use anyhow::Context;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::access;
use crate::app_state::AppState;
use crate::auth::{generate_access_token, generate_refresh_token, verify_token, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::models::{ApiResponse, ReferralType, User};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
    pub referral_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(equal = 6, message = "must be 6 digits"))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(equal = 6, message = "must be 6 digits"))]
    pub code: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub effective_tier: access::Tier,
    pub plan_active: bool,
}

/// Start registration. The OTP email is awaited: if the provider fails, the
/// registration fails with it.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    request.validate()?;

    let pending = state
        .user_service
        .register(
            &request.email,
            &request.name,
            &request.password,
            request.referral_code.as_deref(),
        )
        .await?;

    state
        .email_service
        .send_otp(&pending.email, &pending.name, &pending.otp_code)
        .await
        .context("failed to send verification email")?;

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "email": pending.email,
        "expires_at": pending.expires_at,
    }))))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    request.validate()?;

    let user = state
        .user_service
        .verify_otp(&request.email, &request.otp)
        .await?;

    // Signup bonus for the referrer, flat amount.
    if let Some(referrer_id) = user.referred_by {
        state
            .referral_service
            .record(referrer_id, user.id, ReferralType::SignupBonus, 0.0)
            .await?;
    }

    state.email_service.send_welcome(&user.email, &user.name);

    issue_tokens(&state, user)
}

pub async fn resend_otp(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    request.validate()?;

    let pending = state.user_service.resend_otp(&request.email).await?;
    state
        .email_service
        .send_otp(&pending.email, &pending.name, &pending.otp_code)
        .await
        .context("failed to send verification email")?;

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "email": pending.email,
        "expires_at": pending.expires_at,
    }))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    request.validate()?;

    let user = state
        .user_service
        .login(&request.email, &request.password)
        .await?;

    issue_tokens(&state, user)
}

/// Exchange a refresh token for a fresh token pair. The user row is re-checked
/// so a deactivated account cannot refresh its way back in.
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    let claims = verify_token(&request.refresh_token, &state.jwt_secret)
        .map_err(|_| ApiError::Auth("Invalid or expired refresh token".to_string()))?;
    if !claims.is_refresh() {
        return Err(ApiError::Auth("Not a refresh token".to_string()));
    }

    let user = state
        .user_service
        .get_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Auth("Account no longer exists".to_string()))?;
    if !user.is_active {
        return Err(ApiError::Auth("Account is deactivated".to_string()));
    }

    issue_tokens(&state, user)
}

pub async fn me(AuthUser(user): AuthUser) -> ApiResult<Json<ApiResponse<MeResponse>>> {
    let effective_tier = access::effective_tier(Some(&user));
    let plan_active = access::plan_active(&user, chrono::Utc::now());
    Ok(Json(ApiResponse::ok(MeResponse {
        user,
        effective_tier,
        plan_active,
    })))
}

/// Always answers success so the endpoint cannot be used to probe for
/// registered emails.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    request.validate()?;

    if let Some(reset) = state.user_service.forgot_password(&request.email).await? {
        if let Err(e) = state
            .email_service
            .send_password_reset(&reset.email, &reset.reset_code)
            .await
        {
            tracing::error!(error = %e, "password reset email failed");
        }
    }

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "message": "If the email is registered, a reset code has been sent"
    }))))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    request.validate()?;

    state
        .user_service
        .reset_password(&request.email, &request.code, &request.new_password)
        .await?;

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "message": "Password updated"
    }))))
}

fn issue_tokens(
    state: &AppState,
    user: User,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    let token = generate_access_token(user.id, &state.jwt_secret)?;
    let refresh_token = generate_refresh_token(user.id, &state.jwt_secret)?;
    Ok(Json(ApiResponse::ok(TokenResponse {
        token,
        refresh_token,
        user,
    })))
}
