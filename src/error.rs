use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::{model_store::ModelStoreError, scorer::ScorerError};

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Scorer(#[from] ScorerError),

    #[error("Model error: {0}")]
    Model(#[from] ModelStoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Recommendation history is not configured")]
    StoreUnavailable,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Scorer(ScorerError::UnknownCategory { field, value }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": self.to_string(),
                    "field": field,
                    "value": value,
                }),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::StoreUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": self.to_string() }),
            ),
            AppError::Scorer(ScorerError::CatalogMismatch(_))
            | AppError::Model(_)
            | AppError::Database(_)
            | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": self.to_string() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

// Extractor rejections carry plain-text bodies; surface them as JSON errors
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoricalField;

    #[test]
    fn test_unknown_category_maps_to_unprocessable_entity() {
        let err = AppError::from(ScorerError::UnknownCategory {
            field: CategoricalField::SoilType,
            value: "sandy".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_catalog_mismatch_maps_to_internal_error() {
        let err = AppError::from(ScorerError::CatalogMismatch("Quinoa".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_not_found_and_invalid_input_statuses() {
        assert_eq!(
            AppError::NotFound("crop".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InvalidInput("bad".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::StoreUnavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
