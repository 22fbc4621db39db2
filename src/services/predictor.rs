use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::models::{ClusterId, FeatureVector, FEATURE_COUNT};

/// Error types for the inference stage.
///
/// Every variant is fatal for the current request: a local inference failure
/// is not expected to self-heal, so nothing here is retried.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("model returned no scores")]
    EmptyScores,
    #[error("model returned a non-finite score at index {0}")]
    NonFiniteScore(usize),
    #[error("scoring failed: {0}")]
    ScorerFailure(String),
}

/// Black-box scoring function over one feature row.
///
/// Implementations return one score per cluster label the model was trained
/// with; the predictor only relies on that shape, never on internals. The
/// async seam is where a remote scorer would slot in with a time-bounded
/// variant without changing the contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ClusterScorer: Send + Sync {
    /// Scores a single feature row, returning one score per cluster label.
    async fn score(&self, features: &FeatureVector) -> Result<Vec<f32>, InferenceError>;

    /// Scorer name for logging and debugging.
    fn name(&self) -> &'static str;
}

/// Outcome of one inference call.
///
/// Carries the raw score vector so callers can log diagnostics; the predictor
/// itself only derives the winning cluster from it.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub cluster: ClusterId,
    pub confidence: f32,
    pub scores: Vec<f32>,
}

/// Reduces the scorer's output distribution to a single cluster id.
pub struct ClusterPredictor {
    scorer: Arc<dyn ClusterScorer>,
}

impl ClusterPredictor {
    /// The scorer is owned for the whole session and released by drop on
    /// every exit path, including mid-pipeline failures.
    pub fn new(scorer: Arc<dyn ClusterScorer>) -> Self {
        Self { scorer }
    }

    /// Runs the scorer and takes the arg-max index as the cluster id.
    /// Ties break toward the lowest index; empty or non-finite output is a
    /// degenerate result and surfaces as an error.
    pub async fn predict(&self, features: &FeatureVector) -> Result<Prediction, InferenceError> {
        let scores = self.scorer.score(features).await?;

        if scores.is_empty() {
            return Err(InferenceError::EmptyScores);
        }
        if let Some(index) = scores.iter().position(|s| !s.is_finite()) {
            return Err(InferenceError::NonFiniteScore(index));
        }

        let mut best = 0;
        for (index, &score) in scores.iter().enumerate().skip(1) {
            if score > scores[best] {
                best = index;
            }
        }

        tracing::debug!(
            scorer = self.scorer.name(),
            cluster = best,
            confidence = scores[best],
            "cluster predicted"
        );

        Ok(Prediction {
            cluster: ClusterId::from_index(best),
            confidence: scores[best],
            scores,
        })
    }
}

/// On-disk shape of the pre-trained centroid model.
#[derive(Debug, Deserialize)]
struct CentroidModelFile {
    feature_count: usize,
    /// One mean vector per cluster, in cluster-id order.
    centroids: Vec<Vec<f32>>,
    /// Per-feature 1/sigma, applied before distances are taken.
    inverse_scales: Vec<f32>,
}

/// Concrete scorer backed by a centroid table trained offline.
///
/// Scores are a softmax over negative scaled Euclidean distances, so the
/// nearest centroid receives the highest score and the vector sums to one.
#[derive(Debug)]
pub struct CentroidScorer {
    centroids: Vec<Vec<f32>>,
    inverse_scales: Vec<f32>,
}

impl CentroidScorer {
    /// Loads the model asset from a JSON file, validating its shape against
    /// the fixed feature count before any scoring can happen.
    pub async fn load(path: &Path) -> Result<Self, InferenceError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            InferenceError::ModelUnavailable(format!("{}: {}", path.display(), e))
        })?;

        let file: CentroidModelFile = serde_json::from_str(&raw).map_err(|e| {
            InferenceError::ModelUnavailable(format!("{}: {}", path.display(), e))
        })?;

        Self::from_model(file)
    }

    fn from_model(file: CentroidModelFile) -> Result<Self, InferenceError> {
        if file.feature_count != FEATURE_COUNT {
            return Err(InferenceError::ModelUnavailable(format!(
                "model expects {} features, this build encodes {}",
                file.feature_count, FEATURE_COUNT
            )));
        }
        if file.centroids.is_empty() {
            return Err(InferenceError::ModelUnavailable(
                "model defines no clusters".to_string(),
            ));
        }
        if file.inverse_scales.len() != FEATURE_COUNT {
            return Err(InferenceError::ModelUnavailable(format!(
                "expected {} inverse scales, found {}",
                FEATURE_COUNT,
                file.inverse_scales.len()
            )));
        }
        for (index, centroid) in file.centroids.iter().enumerate() {
            if centroid.len() != FEATURE_COUNT {
                return Err(InferenceError::ModelUnavailable(format!(
                    "centroid {} has {} features, expected {}",
                    index,
                    centroid.len(),
                    FEATURE_COUNT
                )));
            }
            if centroid.iter().any(|v| !v.is_finite()) {
                return Err(InferenceError::ModelUnavailable(format!(
                    "centroid {} contains non-finite values",
                    index
                )));
            }
        }

        Ok(Self {
            centroids: file.centroids,
            inverse_scales: file.inverse_scales,
        })
    }

    fn scaled_squared_distance(&self, row: &[f32], centroid: &[f32]) -> f32 {
        row.iter()
            .zip(centroid)
            .zip(&self.inverse_scales)
            .map(|((x, c), s)| {
                let d = (x - c) * s;
                d * d
            })
            .sum()
    }
}

#[async_trait::async_trait]
impl ClusterScorer for CentroidScorer {
    async fn score(&self, features: &FeatureVector) -> Result<Vec<f32>, InferenceError> {
        let row = features.as_row();

        let neg_distances: Vec<f32> = self
            .centroids
            .iter()
            .map(|centroid| -self.scaled_squared_distance(row, centroid))
            .collect();

        // Softmax, shifted by the max for numeric stability.
        let max = neg_distances.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = neg_distances.iter().map(|d| (d - max).exp()).collect();
        let total: f32 = exps.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(InferenceError::ScorerFailure(
                "degenerate softmax normalizer".to_string(),
            ));
        }

        Ok(exps.into_iter().map(|e| e / total).collect())
    }

    fn name(&self) -> &'static str {
        "centroid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn features(row: [f32; FEATURE_COUNT]) -> FeatureVector {
        FeatureVector::new(row)
    }

    fn fixed_scorer(scores: Vec<f32>) -> ClusterPredictor {
        let mut scorer = MockClusterScorer::new();
        scorer
            .expect_score()
            .returning(move |_| Ok(scores.clone()));
        scorer.expect_name().return_const("mock");
        ClusterPredictor::new(Arc::new(scorer))
    }

    #[tokio::test]
    async fn test_predict_takes_arg_max() {
        let predictor = fixed_scorer(vec![0.1, 0.7, 0.2]);
        let prediction = predictor
            .predict(&features([70.0, 175.0, 30.0, 1.0, 1.375, 65.0]))
            .await
            .unwrap();
        assert_eq!(prediction.cluster, ClusterId(1));
        assert_eq!(prediction.confidence, 0.7);
        assert_eq!(prediction.scores, vec![0.1, 0.7, 0.2]);
    }

    #[tokio::test]
    async fn test_predict_tie_breaks_to_lowest_index() {
        let predictor = fixed_scorer(vec![0.4, 0.4, 0.1]);
        let prediction = predictor
            .predict(&features([70.0, 175.0, 30.0, 1.0, 1.375, 65.0]))
            .await
            .unwrap();
        assert_eq!(prediction.cluster, ClusterId(0));
    }

    #[tokio::test]
    async fn test_predict_is_deterministic() {
        let predictor = fixed_scorer(vec![0.2, 0.5, 0.3]);
        let row = features([70.0, 175.0, 30.0, 1.0, 1.375, 65.0]);
        let first = predictor.predict(&row).await.unwrap();
        let second = predictor.predict(&row).await.unwrap();
        assert_eq!(first.cluster, second.cluster);
    }

    #[tokio::test]
    async fn test_empty_scores_are_an_inference_error() {
        let predictor = fixed_scorer(Vec::new());
        let err = predictor
            .predict(&features([70.0, 175.0, 30.0, 1.0, 1.375, 65.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::EmptyScores));
    }

    #[tokio::test]
    async fn test_non_finite_scores_are_an_inference_error() {
        let predictor = fixed_scorer(vec![0.3, f32::NAN, 0.2]);
        let err = predictor
            .predict(&features([70.0, 175.0, 30.0, 1.0, 1.375, 65.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::NonFiniteScore(1)));
    }

    #[tokio::test]
    async fn test_scorer_failure_propagates() {
        let mut scorer = MockClusterScorer::new();
        scorer
            .expect_score()
            .returning(|_| Err(InferenceError::ScorerFailure("engine gone".to_string())));
        scorer.expect_name().return_const("mock");
        let predictor = ClusterPredictor::new(Arc::new(scorer));

        let err = predictor
            .predict(&features([70.0, 175.0, 30.0, 1.0, 1.375, 65.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::ScorerFailure(_)));
    }

    fn test_model() -> CentroidModelFile {
        CentroidModelFile {
            feature_count: FEATURE_COUNT,
            centroids: vec![
                vec![50.0, 160.0, 22.0, 0.0, 1.2, 48.0],
                vec![70.0, 175.0, 30.0, 1.0, 1.375, 65.0],
                vec![95.0, 185.0, 45.0, 1.0, 1.9, 85.0],
            ],
            inverse_scales: vec![0.066, 0.1, 0.1, 1.0, 2.0, 0.066],
        }
    }

    #[tokio::test]
    async fn test_centroid_scorer_favors_nearest_centroid() {
        let scorer = CentroidScorer::from_model(test_model()).unwrap();
        let scores = scorer
            .score(&features([70.0, 175.0, 30.0, 1.0, 1.375, 65.0]))
            .await
            .unwrap();

        assert_eq!(scores.len(), 3);
        assert!(scores[1] > scores[0]);
        assert!(scores[1] > scores[2]);
        let total: f32 = scores.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_centroid_model_rejects_dimension_mismatch() {
        let mut model = test_model();
        model.centroids[1].pop();
        let err = CentroidScorer::from_model(model).unwrap_err();
        assert!(matches!(err, InferenceError::ModelUnavailable(_)));
    }

    #[test]
    fn test_centroid_model_rejects_wrong_feature_count() {
        let mut model = test_model();
        model.feature_count = 4;
        let err = CentroidScorer::from_model(model).unwrap_err();
        assert!(matches!(err, InferenceError::ModelUnavailable(_)));
    }

    #[test]
    fn test_centroid_model_rejects_empty_cluster_set() {
        let mut model = test_model();
        model.centroids.clear();
        let err = CentroidScorer::from_model(model).unwrap_err();
        assert!(matches!(err, InferenceError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_load_reports_missing_asset() {
        let err = CentroidScorer::load(Path::new("/nonexistent/model.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_load_reports_malformed_asset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = CentroidScorer::load(file.path()).await.unwrap_err();
        assert!(matches!(err, InferenceError::ModelUnavailable(_)));
    }
}
