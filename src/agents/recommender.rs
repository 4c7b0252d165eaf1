//! Recommender Agent
//!
//! Suggests healthier alternatives in the same category as the scanned product.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agents::prompts::RECOMMENDER_AGENT_INSTRUCTION;
use crate::agents::runtime::{AgentDefinition, AgentGateway};
use crate::models::RecommenderResult;
use crate::types::{AppError, AppResult, ToolBinding};

pub const RECOMMENDER_APP_NAME: &str = "safebites-recommender";

#[derive(serde::Serialize)]
struct RecommendPayload<'a> {
    product_name: &'a str,
    overall_score: f64,
}

pub struct RecommenderAgent {
    gateway: Arc<dyn AgentGateway>,
    definition: AgentDefinition,
}

impl RecommenderAgent {
    pub fn new(gateway: Arc<dyn AgentGateway>) -> Self {
        Self {
            gateway,
            definition: AgentDefinition::new(
                "recommender_agent",
                "Finds healthier alternatives for a product.",
                RECOMMENDER_AGENT_INSTRUCTION,
            )
            .with_tool(ToolBinding::WebSearch),
        }
    }

    pub async fn recommend(
        &self,
        product_name: &str,
        current_score: f64,
        cancel: &CancellationToken,
    ) -> AppResult<RecommenderResult> {
        if product_name.trim().is_empty() {
            return Err(AppError::InvalidArgument("product name is required".to_string()));
        }

        let input = serde_json::to_string(&RecommendPayload {
            product_name,
            overall_score: current_score,
        })?;

        let raw = self
            .gateway
            .run(RECOMMENDER_APP_NAME, &self.definition, &input, cancel)
            .await?;

        let result: RecommenderResult = serde_json::from_str(&raw)
            .map_err(|e| AppError::parse("parse recommender result", e))?;

        info!(
            product = %product_name,
            current_score,
            recommendations = result.recommendations.len(),
            "Recommendations received"
        );
        Ok(result)
    }
}
