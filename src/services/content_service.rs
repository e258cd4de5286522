//! Content service layer - announcements and CMS documents

use chrono::Utc;
use serde_json::json;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::access::{self, Tier};
use crate::error::{ApiError, ApiResult};
use crate::models::{AccessLevel, Announcement, CmsDocument};

pub struct ContentService {
    db_pool: PgPool,
}

#[derive(Debug)]
pub struct NewAnnouncement {
    pub title: String,
    pub body: String,
    pub audience: AccessLevel,
}

#[derive(Debug, Default)]
pub struct AnnouncementUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub audience: Option<AccessLevel>,
    pub is_active: Option<bool>,
}

impl ContentService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    // ===== Announcements =====

    pub async fn create_announcement(
        &self,
        created_by: Uuid,
        new: NewAnnouncement,
    ) -> ApiResult<Announcement> {
        let now = Utc::now();
        let announcement = sqlx::query_as::<_, Announcement>(
            r#"
            INSERT INTO announcements
                (id, title, body, audience, is_active, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.body)
        .bind(new.audience)
        .bind(created_by)
        .bind(now)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(announcement)
    }

    /// Active announcements whose audience is visible at the caller's tier.
    pub async fn list_announcements_visible(&self, tier: Tier) -> ApiResult<Vec<Announcement>> {
        let levels = access::allowed_levels(tier);
        let announcements = sqlx::query_as::<_, Announcement>(
            r#"
            SELECT * FROM announcements
            WHERE is_active = TRUE AND audience = ANY($1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(levels)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(announcements)
    }

    pub async fn list_announcements_all(&self, limit: i64, offset: i64) -> ApiResult<Vec<Announcement>> {
        let announcements = sqlx::query_as::<_, Announcement>(
            "SELECT * FROM announcements ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(announcements)
    }

    pub async fn update_announcement(
        &self,
        id: Uuid,
        update: AnnouncementUpdate,
    ) -> ApiResult<Announcement> {
        let existing = sqlx::query_as::<_, Announcement>(
            "SELECT * FROM announcements WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Announcement"))?;

        let announcement = sqlx::query_as::<_, Announcement>(
            r#"
            UPDATE announcements SET
                title = $2, body = $3, audience = $4, is_active = $5, updated_at = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.title.unwrap_or(existing.title))
        .bind(update.body.unwrap_or(existing.body))
        .bind(update.audience.unwrap_or(existing.audience))
        .bind(update.is_active.unwrap_or(existing.is_active))
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        Ok(announcement)
    }

    pub async fn delete_announcement(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Announcement"));
        }
        Ok(())
    }

    // ===== CMS documents (homepage content, dashboard config) =====

    async fn get_document(&self, table: &str) -> ApiResult<CmsDocument> {
        let document = sqlx::query_as::<_, CmsDocument>(&format!(
            "SELECT * FROM {table} ORDER BY updated_at DESC LIMIT 1",
        ))
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(document.unwrap_or(CmsDocument {
            id: Uuid::nil(),
            content: Json(json!({})),
            updated_by: None,
            updated_at: Utc::now(),
        }))
    }

    async fn put_document(
        &self,
        table: &str,
        content: serde_json::Value,
        updated_by: Uuid,
    ) -> ApiResult<CmsDocument> {
        // Single-document table keyed on a fixed id; the upsert replaces the
        // row in place, so concurrent writers serialize and last write wins.
        let document = sqlx::query_as::<_, CmsDocument>(&format!(
            r#"
            INSERT INTO {table} (id, content, updated_by, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                content = EXCLUDED.content,
                updated_by = EXCLUDED.updated_by,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        ))
        .bind(Uuid::nil())
        .bind(Json(content))
        .bind(updated_by)
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        Ok(document)
    }

    pub async fn get_homepage(&self) -> ApiResult<CmsDocument> {
        self.get_document("homepage_content").await
    }

    pub async fn put_homepage(
        &self,
        content: serde_json::Value,
        updated_by: Uuid,
    ) -> ApiResult<CmsDocument> {
        self.put_document("homepage_content", content, updated_by).await
    }

    pub async fn get_dashboard_config(&self) -> ApiResult<CmsDocument> {
        self.get_document("dashboard_config").await
    }

    pub async fn put_dashboard_config(
        &self,
        content: serde_json::Value,
        updated_by: Uuid,
    ) -> ApiResult<CmsDocument> {
        self.put_document("dashboard_config", content, updated_by).await
    }
}
