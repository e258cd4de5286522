//! Pick handlers: tier-filtered reads plus admin management

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::access;
use crate::app_state::AppState;
use crate::auth::{AdminUser, MaybeAuthUser};
use crate::error::{ApiError, ApiResult};
use crate::models::{AccessLevel, ApiResponse, Pick, PickStatus};
use crate::services::pick_service::{NewPick, PickListFilter, PickUpdate};

#[derive(Debug, Deserialize)]
pub struct ListPicksQuery {
    pub page: Option<i32>,
    pub limit: Option<i32>,
    pub sport: Option<String>,
    pub status: Option<PickStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePickRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub sport: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub event_name: String,
    pub event_time: DateTime<Utc>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub prediction: String,
    pub odds: HashMap<String, f64>,
    #[validate(range(min = 0.01, message = "must be positive"))]
    pub stake: f64,
    pub analysis: Option<String>,
    pub access_level: AccessLevel,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePickRequest {
    pub sport: Option<String>,
    pub event_name: Option<String>,
    pub event_time: Option<DateTime<Utc>>,
    pub prediction: Option<String>,
    pub odds: Option<HashMap<String, f64>>,
    pub stake: Option<f64>,
    pub analysis: Option<Option<String>>,
    pub access_level: Option<AccessLevel>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePickStatusRequest {
    pub status: PickStatus,
}

/// List picks visible at the caller's effective tier. Anonymous callers see
/// free picks only.
pub async fn list_picks(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Query(query): Query<ListPicksQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Pick>>>> {
    let tier = access::effective_tier(user.as_ref());
    let pagination = crate::models::PaginationParams {
        page: query.page,
        limit: query.limit,
    };
    let (limit, offset) = pagination.limit_offset();

    let picks = state
        .pick_service
        .list_visible(
            tier,
            PickListFilter {
                sport: query.sport,
                status: query.status,
            },
            limit,
            offset,
        )
        .await?;

    Ok(Json(ApiResponse::ok(picks)))
}

pub async fn get_pick(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Pick>>> {
    let tier = access::effective_tier(user.as_ref());
    let pick = state.pick_service.get_visible(id, tier).await?;
    Ok(Json(ApiResponse::ok(pick)))
}

// ===== Admin =====

pub async fn create_pick(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreatePickRequest>,
) -> ApiResult<Json<ApiResponse<Pick>>> {
    request.validate()?;
    let pick = state
        .pick_service
        .create(
            admin.id,
            NewPick {
                sport: request.sport,
                event_name: request.event_name,
                event_time: request.event_time,
                prediction: request.prediction,
                odds: request.odds,
                stake: request.stake,
                analysis: request.analysis,
                access_level: request.access_level,
            },
        )
        .await?;

    Ok(Json(ApiResponse::ok(pick)))
}

pub async fn update_pick(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePickRequest>,
) -> ApiResult<Json<ApiResponse<Pick>>> {
    if let Some(stake) = request.stake {
        if stake <= 0.0 {
            return Err(ApiError::validation("stake must be positive"));
        }
    }

    let pick = state
        .pick_service
        .update(
            id,
            PickUpdate {
                sport: request.sport,
                event_name: request.event_name,
                event_time: request.event_time,
                prediction: request.prediction,
                odds: request.odds,
                stake: request.stake,
                analysis: request.analysis,
                access_level: request.access_level,
            },
        )
        .await?;

    Ok(Json(ApiResponse::ok(pick)))
}

pub async fn update_pick_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePickStatusRequest>,
) -> ApiResult<Json<ApiResponse<Pick>>> {
    let pick = state.pick_service.update_status(id, request.status).await?;
    Ok(Json(ApiResponse::ok(pick)))
}

pub async fn delete_pick(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    state.pick_service.delete(id).await?;
    Ok(Json(ApiResponse::ok(serde_json::json!({ "deleted": id }))))
}
