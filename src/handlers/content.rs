//! Content handlers: announcements, CMS documents, contact inquiries

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::access;
use crate::app_state::AppState;
use crate::auth::{AdminUser, MaybeAuthUser};
use crate::error::ApiResult;
use crate::models::{
    AccessLevel, Announcement, ApiResponse, CmsDocument, ContactInquiry, PaginationParams,
};
use crate::services::content_service::{AnnouncementUpdate, NewAnnouncement};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAnnouncementRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub body: String,
    pub audience: AccessLevel,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub audience: Option<AccessLevel>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub subject: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PutDocumentRequest {
    pub content: serde_json::Value,
}

// ===== Announcements =====

pub async fn list_announcements(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
) -> ApiResult<Json<ApiResponse<Vec<Announcement>>>> {
    let tier = access::effective_tier(user.as_ref());
    let announcements = state
        .content_service
        .list_announcements_visible(tier)
        .await?;
    Ok(Json(ApiResponse::ok(announcements)))
}

pub async fn list_all_announcements(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Announcement>>>> {
    let (limit, offset) = pagination.limit_offset();
    let announcements = state
        .content_service
        .list_announcements_all(limit, offset)
        .await?;
    Ok(Json(ApiResponse::ok(announcements)))
}

pub async fn create_announcement(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreateAnnouncementRequest>,
) -> ApiResult<Json<ApiResponse<Announcement>>> {
    request.validate()?;
    let announcement = state
        .content_service
        .create_announcement(
            admin.id,
            NewAnnouncement {
                title: request.title,
                body: request.body,
                audience: request.audience,
            },
        )
        .await?;
    Ok(Json(ApiResponse::ok(announcement)))
}

pub async fn update_announcement(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAnnouncementRequest>,
) -> ApiResult<Json<ApiResponse<Announcement>>> {
    let announcement = state
        .content_service
        .update_announcement(
            id,
            AnnouncementUpdate {
                title: request.title,
                body: request.body,
                audience: request.audience,
                is_active: request.is_active,
            },
        )
        .await?;
    Ok(Json(ApiResponse::ok(announcement)))
}

pub async fn delete_announcement(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    state.content_service.delete_announcement(id).await?;
    Ok(Json(ApiResponse::ok(serde_json::json!({ "deleted": id }))))
}

// ===== CMS documents =====

pub async fn get_homepage(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<CmsDocument>>> {
    let document = state.content_service.get_homepage().await?;
    Ok(Json(ApiResponse::ok(document)))
}

pub async fn put_homepage(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<PutDocumentRequest>,
) -> ApiResult<Json<ApiResponse<CmsDocument>>> {
    let document = state
        .content_service
        .put_homepage(request.content, admin.id)
        .await?;
    Ok(Json(ApiResponse::ok(document)))
}

pub async fn get_dashboard_config(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<CmsDocument>>> {
    let document = state.content_service.get_dashboard_config().await?;
    Ok(Json(ApiResponse::ok(document)))
}

pub async fn put_dashboard_config(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<PutDocumentRequest>,
) -> ApiResult<Json<ApiResponse<CmsDocument>>> {
    let document = state
        .content_service
        .put_dashboard_config(request.content, admin.id)
        .await?;
    Ok(Json(ApiResponse::ok(document)))
}

// ===== Contact =====

pub async fn submit_contact(
    State(state): State<AppState>,
    Json(request): Json<ContactRequest>,
) -> ApiResult<Json<ApiResponse<ContactInquiry>>> {
    request.validate()?;
    let inquiry = state
        .support_service
        .create_inquiry(
            &request.name,
            &request.email,
            &request.subject,
            &request.message,
        )
        .await?;
    Ok(Json(ApiResponse::ok(inquiry)))
}

pub async fn list_inquiries(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<ContactInquiry>>>> {
    let (limit, offset) = pagination.limit_offset();
    let inquiries = state.support_service.list_inquiries(limit, offset).await?;
    Ok(Json(ApiResponse::ok(inquiries)))
}

pub async fn mark_inquiry_read(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    state.support_service.mark_inquiry_read(id).await?;
    Ok(Json(ApiResponse::ok(serde_json::json!({ "read": id }))))
}
