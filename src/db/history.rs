use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{FarmConditions, NewRecommendationRecord, Recommendation, RecommendationRecord},
};

/// Persistence for recommendation requests and their results
#[async_trait::async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Stores one recommendation call and returns the persisted record
    async fn save(&self, record: NewRecommendationRecord) -> AppResult<RecommendationRecord>;

    /// Most recent calls for a user, newest first
    async fn list_for_user(&self, user_id: i64, limit: i64) -> AppResult<Vec<RecommendationRecord>>;
}

#[derive(sqlx::FromRow)]
struct RecommendationRow {
    id: Uuid,
    user_id: Option<i64>,
    input_parameters: Json<FarmConditions>,
    recommendations: Json<Vec<Recommendation>>,
    total_crops_analyzed: i32,
    created_at: DateTime<Utc>,
}

impl From<RecommendationRow> for RecommendationRecord {
    fn from(row: RecommendationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            input_parameters: row.input_parameters.0,
            recommendations: row.recommendations.0,
            total_crops_analyzed: row.total_crops_analyzed.max(0) as usize,
            created_at: row.created_at,
        }
    }
}

/// Postgres-backed recommendation history
pub struct PgRecommendationStore {
    pool: PgPool,
}

impl PgRecommendationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecommendationStore for PgRecommendationStore {
    async fn save(&self, record: NewRecommendationRecord) -> AppResult<RecommendationRecord> {
        let total = i32::try_from(record.result.total_crops_analyzed)
            .map_err(|_| AppError::Internal("Crop count exceeds storage range".to_string()))?;

        let row = sqlx::query_as::<_, RecommendationRow>(
            r#"
            INSERT INTO crop_recommendations
                (id, user_id, input_parameters, recommendations, total_crops_analyzed)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, input_parameters, recommendations, total_crops_analyzed, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.user_id)
        .bind(Json(&record.result.input_parameters))
        .bind(Json(&record.result.recommendations))
        .bind(total)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(recommendation_id = %row.id, user_id = ?row.user_id, "Stored recommendation");

        Ok(row.into())
    }

    async fn list_for_user(&self, user_id: i64, limit: i64) -> AppResult<Vec<RecommendationRecord>> {
        let rows = sqlx::query_as::<_, RecommendationRow>(
            r#"
            SELECT id, user_id, input_parameters, recommendations, total_crops_analyzed, created_at
            FROM crop_recommendations
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RecommendationRecord::from).collect())
    }
}
