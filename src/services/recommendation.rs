use std::sync::Arc;

use thiserror::Error;

use crate::{
    models::{ClusterId, MealPlan, ProfileInput},
    services::{
        catalog::{CatalogError, RecipeCatalog},
        predictor::{ClusterPredictor, ClusterScorer, InferenceError},
        vectorizer::{self, ValidationError},
    },
};

/// Terminal outcome of one recommendation request.
///
/// Each pipeline stage converts its local error into exactly one of these;
/// no stage recovers or retries, and the next request starts fresh.
/// `NoRecommendations` is an expected, reportable outcome, not a fault.
#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),
    #[error("inference failed: {0}")]
    InferenceFailed(#[from] InferenceError),
    #[error("recipe catalog unavailable: {0}")]
    CatalogUnavailable(#[from] CatalogError),
    #[error("no recipes available for cluster {cluster}")]
    NoRecommendations { cluster: ClusterId },
}

/// Composition root of the pipeline: vectorize, predict, filter, bucket.
pub struct RecommendationEngine {
    predictor: ClusterPredictor,
    catalog: RecipeCatalog,
}

impl RecommendationEngine {
    pub fn new(scorer: Arc<dyn ClusterScorer>, catalog: RecipeCatalog) -> Self {
        Self {
            predictor: ClusterPredictor::new(scorer),
            catalog,
        }
    }

    /// The catalog is exposed so the diagnostic surface can dump it without
    /// going through `recommend`.
    pub fn catalog(&self) -> &RecipeCatalog {
        &self.catalog
    }

    /// Runs the full pipeline for one request.
    pub async fn recommend(&self, input: &ProfileInput) -> Result<MealPlan, RecommendationError> {
        // 1. Validate and vectorize; nothing downstream runs on bad input
        let profile = vectorizer::parse_profile(input)?;
        let features = vectorizer::vectorize(&profile);
        tracing::debug!(features = ?features.as_row(), "profile vectorized");

        // 2. Predict the cluster
        let prediction = self.predictor.predict(&features).await?;
        tracing::debug!(
            cluster = %prediction.cluster,
            scores = ?prediction.scores,
            "raw model output"
        );

        // 3. Ensure the catalog is loaded (lazy, cached for the session)
        let snapshot = self.catalog.snapshot().await?;

        // 4. Filter to the predicted cluster
        let matches = snapshot.filter_by_cluster(prediction.cluster);
        if matches.is_empty() {
            tracing::warn!(
                cluster = %prediction.cluster,
                "no recipes found for predicted cluster"
            );
            return Err(RecommendationError::NoRecommendations {
                cluster: prediction.cluster,
            });
        }

        // 5. Bucket into meal slots
        let plan = MealPlan::partition(prediction.cluster, matches);
        tracing::info!(
            cluster = %plan.cluster,
            morning = plan.morning.len(),
            afternoon = plan.afternoon.len(),
            evening = plan.evening.len(),
            "recommendation completed"
        );

        Ok(plan)
    }
}
