use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{
        CatalogFilter, CropDetails, CropProfile, FarmConditions, NewRecommendationRecord,
        Recommendation, RecommendationRecord,
    },
    services::ScorerError,
};

use super::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 20;
const MAX_HISTORY_LIMIT: i64 = 100;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(flatten)]
    pub conditions: FarmConditions,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    /// Present only when recommendation history is enabled
    pub recommendation_id: Option<Uuid>,
    pub recommendations: Vec<Recommendation>,
    pub input_parameters: FarmConditions,
    pub total_crops_analyzed: usize,
}

#[derive(Debug, Serialize)]
pub struct CropListResponse {
    pub crops: Vec<CropProfile>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub user_id: i64,
    pub recommendations: Vec<RecommendationRecord>,
    pub total: usize,
}

// Handlers

/// Service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "FARMER API - Crop recommendation service",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "active",
    }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "farmer-api",
            "model_ready": state.scorer.is_ready(),
        })),
    )
}

/// Ranks catalog crops for the submitted farm conditions
///
/// Categorical values are checked before measurements, so an unknown
/// category is reported even when a measurement is also implausible.
pub async fn recommend_crops(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<RecommendationRequest>, JsonRejection>,
) -> AppResult<Json<RecommendationResponse>> {
    let Json(request) = payload?;

    tracing::info!(
        request_id = %request_id,
        user_id = ?request.user_id,
        soil_type = %request.conditions.soil_type,
        season = %request.conditions.season,
        "Processing crop recommendation request"
    );

    let scorer = state.scorer().await?;
    let rejected = |e: ScorerError| {
        tracing::warn!(request_id = %request_id, error = %e, "Crop recommendation rejected");
        e
    };

    scorer
        .model()
        .vocabulary
        .check_categories(&request.conditions)
        .map_err(rejected)?;
    request
        .conditions
        .validate_measurements()
        .map_err(AppError::InvalidInput)?;

    let result = scorer.recommend(&request.conditions).map_err(rejected)?;

    let recommendation_id = match &state.store {
        Some(store) => {
            let record = store
                .save(NewRecommendationRecord {
                    user_id: request.user_id,
                    result: result.clone(),
                })
                .await?;
            Some(record.id)
        }
        None => None,
    };

    tracing::info!(
        request_id = %request_id,
        top_crop = result.recommendations.first().map(|r| r.crop_name.as_str()),
        recommendation_id = ?recommendation_id,
        "Crop recommendation completed"
    );

    Ok(Json(RecommendationResponse {
        recommendation_id,
        recommendations: result.recommendations,
        input_parameters: result.input_parameters,
        total_crops_analyzed: result.total_crops_analyzed,
    }))
}

/// Lists catalog crops, optionally filtered by season, soil type and water requirement
pub async fn list_crops(
    State(state): State<AppState>,
    filter: Result<Query<CatalogFilter>, QueryRejection>,
) -> AppResult<Json<CropListResponse>> {
    let Query(filter) = filter?;
    let crops: Vec<CropProfile> = state.catalog().filter(&filter).into_iter().cloned().collect();
    let total = crops.len();
    Ok(Json(CropListResponse { crops, total }))
}

/// Growing details for a single crop
pub async fn crop_details(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<CropDetails>> {
    Ok(Json(state.catalog().details(&name)?))
}

/// Past recommendation calls for a user, newest first
pub async fn recommendation_history(
    State(state): State<AppState>,
    user_id: Result<Path<i64>, PathRejection>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> AppResult<Json<HistoryResponse>> {
    let Path(user_id) = user_id?;
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(AppError::InvalidInput(format!(
            "limit must be between 1 and {}",
            MAX_HISTORY_LIMIT
        )));
    }

    let recommendations = state.store()?.list_for_user(user_id, limit).await?;
    let total = recommendations.len();

    Ok(Json(HistoryResponse {
        user_id,
        recommendations,
        total,
    }))
}
