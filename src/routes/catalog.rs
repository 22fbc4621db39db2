use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::RecipeRecord,
    routes::AppState,
    services::recommendation::RecommendationError,
};

/// Diagnostic view of the loaded catalog.
#[derive(Debug, Serialize)]
pub struct CatalogDump {
    pub loaded_at: DateTime<Utc>,
    pub records: Vec<RecipeRecord>,
}

/// Handler for the catalog diagnostic endpoint.
///
/// Dumps the cached snapshot (loading it on first use) so operators can
/// check what the recommender is filtering against, without running a
/// recommendation. Independent of `recommend` by design.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<CatalogDump>> {
    let snapshot = state
        .engine
        .catalog()
        .snapshot()
        .await
        .map_err(RecommendationError::CatalogUnavailable)
        .map_err(AppError::from)?;

    for (index, record) in snapshot.records.iter().enumerate() {
        tracing::debug!(
            request_id = %request_id,
            row = index + 1,
            name = %record.name,
            calories = %record.calories,
            kind = %record.kind,
            image = %record.image,
            "catalog record"
        );
    }

    tracing::info!(
        request_id = %request_id,
        records = snapshot.records.len(),
        "catalog dump served"
    );

    Ok(Json(CatalogDump {
        loaded_at: snapshot.loaded_at,
        records: snapshot.records.clone(),
    }))
}
