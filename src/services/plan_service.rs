//! Plan catalog service layer

use chrono::Utc;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Plan, PlanTier};

pub struct PlanService {
    db_pool: PgPool,
}

#[derive(Debug)]
pub struct NewPlan {
    pub name: String,
    pub tier: PlanTier,
    pub price: f64,
    pub duration_days: i32,
    pub features: Vec<String>,
}

#[derive(Debug, Default)]
pub struct PlanUpdate {
    pub name: Option<String>,
    pub tier: Option<PlanTier>,
    pub price: Option<f64>,
    pub duration_days: Option<i32>,
    pub features: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl PlanService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn list_active(&self) -> ApiResult<Vec<Plan>> {
        let plans = sqlx::query_as::<_, Plan>(
            "SELECT * FROM plans WHERE is_active = TRUE ORDER BY price ASC",
        )
        .fetch_all(&self.db_pool)
        .await?;
        Ok(plans)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Plan> {
        let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(ApiError::NotFound("Plan"))?;
        Ok(plan)
    }

    pub async fn create(&self, new_plan: NewPlan) -> ApiResult<Plan> {
        let now = Utc::now();
        let plan = sqlx::query_as::<_, Plan>(
            r#"
            INSERT INTO plans
                (id, name, tier, price, duration_days, features, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_plan.name)
        .bind(new_plan.tier)
        .bind(new_plan.price)
        .bind(new_plan.duration_days)
        .bind(Json(&new_plan.features))
        .bind(now)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(plan)
    }

    pub async fn update(&self, id: Uuid, update: PlanUpdate) -> ApiResult<Plan> {
        let existing = self.get(id).await?;

        let plan = sqlx::query_as::<_, Plan>(
            r#"
            UPDATE plans SET
                name = $2, tier = $3, price = $4, duration_days = $5,
                features = $6, is_active = $7, updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.name.unwrap_or(existing.name))
        .bind(update.tier.unwrap_or(existing.tier))
        .bind(update.price.unwrap_or(existing.price))
        .bind(update.duration_days.unwrap_or(existing.duration_days))
        .bind(Json(update.features.unwrap_or(existing.features.0)))
        .bind(update.is_active.unwrap_or(existing.is_active))
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        Ok(plan)
    }

    /// Retire a plan from the catalog; existing subscriptions keep their terms.
    pub async fn retire(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query(
            "UPDATE plans SET is_active = FALSE, updated_at = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Plan"));
        }
        Ok(())
    }
}
