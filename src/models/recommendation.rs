use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::FarmConditions;

/// A single ranked crop suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub crop_name: String,
    /// Raw class probability in [0, 1]
    pub confidence: f64,
    pub yield_per_hectare: f64,
    pub market_price: f64,
    pub water_requirement: String,
    pub season: String,
    /// `confidence * 100`
    pub suitability_score: f64,
}

/// Scorer output for one set of farm conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub recommendations: Vec<Recommendation>,
    pub input_parameters: FarmConditions,
    pub total_crops_analyzed: usize,
}

/// A recommendation call waiting to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecommendationRecord {
    pub user_id: Option<i64>,
    pub result: RecommendationSet,
}

/// A persisted recommendation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub id: Uuid,
    pub user_id: Option<i64>,
    pub input_parameters: FarmConditions,
    pub recommendations: Vec<Recommendation>,
    pub total_crops_analyzed: usize,
    pub created_at: DateTime<Utc>,
}
