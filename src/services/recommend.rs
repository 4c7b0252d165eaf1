// Stand-alone recommendations for a product with a known score

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::models::RecommenderResult;
use crate::services::RecommendationRunner;
use crate::types::{AppError, AppResult};

pub struct RecommendService {
    runner: Arc<dyn RecommendationRunner>,
}

impl RecommendService {
    pub fn new(runner: Arc<dyn RecommendationRunner>) -> Self {
        Self { runner }
    }

    pub async fn recommend(
        &self,
        product_name: &str,
        score: f64,
        cancel: &CancellationToken,
    ) -> AppResult<RecommenderResult> {
        let product_name = product_name.trim();
        if product_name.is_empty() {
            return Err(AppError::InvalidArgument("product name is required".to_string()));
        }
        if !score.is_finite() || score < 0.0 {
            return Err(AppError::InvalidArgument("score must be non-negative".to_string()));
        }

        self.runner
            .recommend(product_name, score, cancel)
            .await
            .map_err(|e| AppError::in_phase("run recommender workflow", e))
    }
}
