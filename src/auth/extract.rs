//! Request extractors for authenticated routes
//!
//! `AuthUser` verifies the bearer token and re-loads the user from the
//! database, rejecting deactivated accounts and refresh tokens. `AdminUser`
//! additionally requires `role = admin`. `MaybeAuthUser` is for public
//! endpoints whose response is tier-aware but does not require a login.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::app_state::AppState;
use crate::auth::verify_token;
use crate::error::ApiError;
use crate::models::{User, UserRole};

/// An authenticated, active user.
pub struct AuthUser(pub User);

/// An authenticated admin.
pub struct AdminUser(pub User);

/// An optionally-authenticated user. Missing or invalid credentials resolve to
/// `None` rather than an error.
pub struct MaybeAuthUser(pub Option<User>);

async fn load_user(parts: &mut Parts, state: &AppState) -> Result<User, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Auth("Missing bearer token".to_string()))?;

    let claims = verify_token(bearer.token(), &state.jwt_secret)
        .map_err(|_| ApiError::Auth("Invalid or expired token".to_string()))?;
    if claims.is_refresh() {
        return Err(ApiError::Auth(
            "Refresh token cannot be used for access".to_string(),
        ));
    }

    let user = state
        .user_service
        .get_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Auth("Account no longer exists".to_string()))?;
    if !user.is_active {
        return Err(ApiError::Auth("Account is deactivated".to_string()));
    }

    Ok(user)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        load_user(parts, state).await.map(AuthUser)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = load_user(parts, state).await?;
        if user.role != UserRole::Admin {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(load_user(parts, state).await.ok()))
    }
}
