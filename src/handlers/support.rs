//! Support ticket handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::{AdminUser, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    ApiResponse, PaginationParams, SupportTicket, TicketStatus, UserRole,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicketRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub subject: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RespondRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ListTicketsQuery {
    pub status: Option<TicketStatus>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

pub async fn create_ticket(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateTicketRequest>,
) -> ApiResult<Json<ApiResponse<SupportTicket>>> {
    request.validate()?;
    let ticket = state
        .support_service
        .create_ticket(user.id, &request.subject, &request.message)
        .await?;
    Ok(Json(ApiResponse::ok(ticket)))
}

pub async fn my_tickets(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<SupportTicket>>>> {
    let tickets = state.support_service.list_for_user(user.id).await?;
    Ok(Json(ApiResponse::ok(tickets)))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<SupportTicket>>> {
    let ticket = state.support_service.get(id).await?;
    if user.role != UserRole::Admin && ticket.user_id != user.id {
        return Err(ApiError::NotFound("Support ticket"));
    }
    Ok(Json(ApiResponse::ok(ticket)))
}

/// Append to the ticket thread as the authenticated user (owner or admin).
pub async fn respond(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RespondRequest>,
) -> ApiResult<Json<ApiResponse<SupportTicket>>> {
    request.validate()?;
    let ticket = state
        .support_service
        .respond(id, user.id, user.role, &request.message)
        .await?;
    Ok(Json(ApiResponse::ok(ticket)))
}

// ===== Admin =====

pub async fn list_tickets(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListTicketsQuery>,
) -> ApiResult<Json<ApiResponse<Vec<SupportTicket>>>> {
    let (limit, offset) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .limit_offset();

    let tickets = state
        .support_service
        .list(query.status, limit, offset)
        .await?;
    Ok(Json(ApiResponse::ok(tickets)))
}

pub async fn close_ticket(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<SupportTicket>>> {
    let ticket = state.support_service.close(id).await?;
    Ok(Json(ApiResponse::ok(ticket)))
}
