// Use-case services on top of the orchestrator and vision OCR

pub mod analyze;
pub mod recommend;

pub use analyze::{AnalyzeOutcome, AnalyzeService};
pub use recommend::RecommendService;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::agents::Orchestrator;
use crate::models::{RecommenderResult, UserPreferences, WorkflowResult};
use crate::types::AppResult;
use crate::vision::VisionOcr;

#[async_trait]
pub trait ProductNameExtractor: Send + Sync {
    async fn extract_product_name(
        &self,
        image: &[u8],
        mime_type: &str,
        cancel: &CancellationToken,
    ) -> AppResult<String>;
}

#[async_trait]
pub trait AnalyzeWorkflow: Send + Sync {
    async fn analyze_and_improve(
        &self,
        product_name: &str,
        prefs: Option<&UserPreferences>,
        cancel: &CancellationToken,
    ) -> AppResult<WorkflowResult>;
}

#[async_trait]
pub trait RecommendationRunner: Send + Sync {
    async fn recommend(
        &self,
        product_name: &str,
        score: f64,
        cancel: &CancellationToken,
    ) -> AppResult<RecommenderResult>;
}

#[async_trait]
impl ProductNameExtractor for VisionOcr {
    async fn extract_product_name(
        &self,
        image: &[u8],
        mime_type: &str,
        cancel: &CancellationToken,
    ) -> AppResult<String> {
        VisionOcr::extract_product_name(self, image, mime_type, cancel).await
    }
}

#[async_trait]
impl AnalyzeWorkflow for Orchestrator {
    async fn analyze_and_improve(
        &self,
        product_name: &str,
        prefs: Option<&UserPreferences>,
        cancel: &CancellationToken,
    ) -> AppResult<WorkflowResult> {
        Orchestrator::analyze_and_improve(self, product_name, prefs, cancel).await
    }
}

#[async_trait]
impl RecommendationRunner for Orchestrator {
    async fn recommend(
        &self,
        product_name: &str,
        score: f64,
        cancel: &CancellationToken,
    ) -> AppResult<RecommenderResult> {
        Orchestrator::recommend(self, product_name, score, cancel).await
    }
}
