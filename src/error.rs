use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::recommendation::RecommendationError;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Recommendation(#[from] RecommendationError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    /// Every terminal state maps to one category-level message. Internal
    /// diagnostics (scores, parsed rows, file paths) stay in the logs and
    /// are never surfaced verbatim to the caller.
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Recommendation(RecommendationError::InvalidInput(e)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            AppError::Recommendation(RecommendationError::NoRecommendations { .. }) => (
                StatusCode::NOT_FOUND,
                "No recipes available for this profile.".to_string(),
            ),
            AppError::Recommendation(RecommendationError::InferenceFailed(e)) => {
                tracing::error!(error = %e, "inference stage failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Recommendation model is unavailable.".to_string(),
                )
            }
            AppError::Recommendation(RecommendationError::CatalogUnavailable(e)) => {
                tracing::error!(error = %e, "catalog stage failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Recipe data is unavailable.".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "unhandled internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
