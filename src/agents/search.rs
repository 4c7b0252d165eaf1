//! Search Agent
//!
//! Looks up the ingredient list of a product through grounded web search.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agents::prompts::SEARCH_AGENT_INSTRUCTION;
use crate::agents::runtime::{AgentDefinition, AgentGateway};
use crate::models::WebSearchResult;
use crate::types::{AppError, AppResult, ToolBinding};

pub const SEARCH_APP_NAME: &str = "safebites-search";

pub struct SearchAgent {
    gateway: Arc<dyn AgentGateway>,
    definition: AgentDefinition,
}

impl SearchAgent {
    pub fn new(gateway: Arc<dyn AgentGateway>) -> Self {
        Self {
            gateway,
            definition: AgentDefinition::new(
                "search_agent",
                "Finds product ingredients using grounded web search.",
                SEARCH_AGENT_INSTRUCTION,
            )
            .with_tool(ToolBinding::WebSearch),
        }
    }

    pub async fn search(
        &self,
        product_name: &str,
        cancel: &CancellationToken,
    ) -> AppResult<WebSearchResult> {
        if product_name.trim().is_empty() {
            return Err(AppError::InvalidArgument("product name is required".to_string()));
        }

        let raw = self
            .gateway
            .run(SEARCH_APP_NAME, &self.definition, product_name, cancel)
            .await?;

        let result: WebSearchResult =
            serde_json::from_str(&raw).map_err(|e| AppError::parse("parse search result", e))?;

        info!(product = %product_name, ingredients = result.ingredients.len(), "Ingredient search finished");
        Ok(result)
    }
}
