//! Pick service layer - tier-gated sports predictions

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::access::{self, Tier};
use crate::error::{ApiError, ApiResult};
use crate::models::{potential_return, AccessLevel, Pick, PickStatus};

pub struct PickService {
    db_pool: PgPool,
}

#[derive(Debug)]
pub struct NewPick {
    pub sport: String,
    pub event_name: String,
    pub event_time: DateTime<Utc>,
    pub prediction: String,
    pub odds: HashMap<String, f64>,
    pub stake: f64,
    pub analysis: Option<String>,
    pub access_level: AccessLevel,
}

/// Partial update; `None` leaves a field unchanged. Changing stake, odds or
/// prediction recomputes `potential_return`.
#[derive(Debug, Default)]
pub struct PickUpdate {
    pub sport: Option<String>,
    pub event_name: Option<String>,
    pub event_time: Option<DateTime<Utc>>,
    pub prediction: Option<String>,
    pub odds: Option<HashMap<String, f64>>,
    pub stake: Option<f64>,
    pub analysis: Option<Option<String>>,
    pub access_level: Option<AccessLevel>,
}

#[derive(Debug, Default)]
pub struct PickListFilter {
    pub sport: Option<String>,
    pub status: Option<PickStatus>,
}

impl PickService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn create(&self, created_by: Uuid, new_pick: NewPick) -> ApiResult<Pick> {
        ensure_quoted(&new_pick.odds, &new_pick.prediction)?;
        let computed =
            potential_return(new_pick.stake, &new_pick.odds, &new_pick.prediction);
        let now = Utc::now();

        let pick = sqlx::query_as::<_, Pick>(
            r#"
            INSERT INTO picks
                (id, sport, event_name, event_time, prediction, odds, stake,
                 potential_return, analysis, access_level, status, is_active,
                 created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', TRUE, $11, $12, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_pick.sport)
        .bind(&new_pick.event_name)
        .bind(new_pick.event_time)
        .bind(&new_pick.prediction)
        .bind(Json(&new_pick.odds))
        .bind(new_pick.stake)
        .bind(computed)
        .bind(&new_pick.analysis)
        .bind(new_pick.access_level)
        .bind(created_by)
        .bind(now)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(pick)
    }

    /// List active picks visible at the caller's tier, newest first.
    pub async fn list_visible(
        &self,
        tier: Tier,
        filter: PickListFilter,
        limit: i64,
        offset: i64,
    ) -> ApiResult<Vec<Pick>> {
        let levels = access::allowed_levels(tier);

        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM picks WHERE is_active = TRUE AND access_level = ANY(");
        query_builder.push_bind(levels);
        query_builder.push(")");

        if let Some(sport) = &filter.sport {
            query_builder.push(" AND sport = ");
            query_builder.push_bind(sport.clone());
        }
        if let Some(status) = filter.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let picks = query_builder
            .build_query_as::<Pick>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(picks)
    }

    /// Fetch one pick, enforcing tier visibility.
    pub async fn get_visible(&self, id: Uuid, tier: Tier) -> ApiResult<Pick> {
        let pick = self.get(id).await?;
        if !pick.is_active {
            return Err(ApiError::NotFound("Pick"));
        }
        if !access::is_accessible(pick.access_level, tier) {
            return Err(ApiError::Forbidden(
                "Upgrade your plan to view this pick".to_string(),
            ));
        }
        Ok(pick)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Pick> {
        let pick = sqlx::query_as::<_, Pick>("SELECT * FROM picks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(ApiError::NotFound("Pick"))?;
        Ok(pick)
    }

    pub async fn update(&self, id: Uuid, update: PickUpdate) -> ApiResult<Pick> {
        let existing = self.get(id).await?;

        let prediction = update.prediction.unwrap_or(existing.prediction);
        let odds = update.odds.unwrap_or(existing.odds.0);
        let stake = update.stake.unwrap_or(existing.stake);
        ensure_quoted(&odds, &prediction)?;
        let computed = potential_return(stake, &odds, &prediction);
        let analysis = match update.analysis {
            Some(value) => value,
            None => existing.analysis,
        };

        let pick = sqlx::query_as::<_, Pick>(
            r#"
            UPDATE picks SET
                sport = $2, event_name = $3, event_time = $4, prediction = $5,
                odds = $6, stake = $7, potential_return = $8, analysis = $9,
                access_level = $10, updated_at = $11
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.sport.unwrap_or(existing.sport))
        .bind(update.event_name.unwrap_or(existing.event_name))
        .bind(update.event_time.unwrap_or(existing.event_time))
        .bind(&prediction)
        .bind(Json(&odds))
        .bind(stake)
        .bind(computed)
        .bind(&analysis)
        .bind(update.access_level.unwrap_or(existing.access_level))
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        Ok(pick)
    }

    pub async fn update_status(&self, id: Uuid, status: PickStatus) -> ApiResult<Pick> {
        let pick = sqlx::query_as::<_, Pick>(
            "UPDATE picks SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Pick"))?;

        Ok(pick)
    }

    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM picks WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Pick"));
        }
        Ok(())
    }

    pub async fn count_active(&self) -> ApiResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM picks WHERE is_active = TRUE")
                .fetch_one(&self.db_pool)
                .await?;
        Ok(count)
    }
}

/// A prediction must name one of the quoted outcomes, or `potential_return`
/// would silently compute to zero. Checked on create and on the merged
/// prediction/odds pair of every update.
fn ensure_quoted(odds: &HashMap<String, f64>, prediction: &str) -> ApiResult<()> {
    if odds.contains_key(prediction) {
        Ok(())
    } else {
        Err(ApiError::validation(
            "prediction must be one of the odds outcomes",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn odds(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn prediction_outside_the_odds_table_is_rejected() {
        let o = odds(&[("home", 1.9), ("away", 4.1)]);
        assert!(ensure_quoted(&o, "home").is_ok());
        assert!(matches!(
            ensure_quoted(&o, "draw"),
            Err(ApiError::Validation { .. })
        ));
    }
}
