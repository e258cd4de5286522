//! Plan catalog handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::models::{ApiResponse, Plan, PlanTier};
use crate::services::plan_service::{NewPlan, PlanUpdate};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlanRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
    pub tier: PlanTier,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub price: f64,
    #[validate(range(min = 1, message = "must be at least one day"))]
    pub duration_days: i32,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlanRequest {
    pub name: Option<String>,
    pub tier: Option<PlanTier>,
    pub price: Option<f64>,
    pub duration_days: Option<i32>,
    pub features: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

pub async fn list_plans(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<Plan>>>> {
    let plans = state.plan_service.list_active().await?;
    Ok(Json(ApiResponse::ok(plans)))
}

pub async fn create_plan(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(request): Json<CreatePlanRequest>,
) -> ApiResult<Json<ApiResponse<Plan>>> {
    request.validate()?;
    let plan = state
        .plan_service
        .create(NewPlan {
            name: request.name,
            tier: request.tier,
            price: request.price,
            duration_days: request.duration_days,
            features: request.features,
        })
        .await?;
    Ok(Json(ApiResponse::ok(plan)))
}

pub async fn update_plan(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePlanRequest>,
) -> ApiResult<Json<ApiResponse<Plan>>> {
    let plan = state
        .plan_service
        .update(
            id,
            PlanUpdate {
                name: request.name,
                tier: request.tier,
                price: request.price,
                duration_days: request.duration_days,
                features: request.features,
                is_active: request.is_active,
            },
        )
        .await?;
    Ok(Json(ApiResponse::ok(plan)))
}

pub async fn delete_plan(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    state.plan_service.retire(id).await?;
    Ok(Json(ApiResponse::ok(serde_json::json!({ "retired": id }))))
}
