use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{MealPlan, ProfileInput},
    routes::AppState,
};

/// Handler for the recommendation endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(input): Json<ProfileInput>,
) -> AppResult<Json<MealPlan>> {
    tracing::info!(
        request_id = %request_id,
        "Processing recommendation request"
    );

    let plan = state.engine.recommend(&input).await?;

    tracing::info!(
        request_id = %request_id,
        cluster = %plan.cluster,
        recipes = plan.len(),
        "Recommendation request completed"
    );

    Ok(Json(plan))
}
