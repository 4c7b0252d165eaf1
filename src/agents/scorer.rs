//! Scorer Agent
//!
//! Rates ingredients, or recommended alternatives, against the user's
//! preferences. The two inputs go to separate agent definitions but share one
//! payload format and one decoding path.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agents::prompts::{INGREDIENT_SCORER_INSTRUCTION, RECOMMENDATION_EVALUATOR_INSTRUCTION};
use crate::agents::runtime::{AgentDefinition, AgentGateway};
use crate::models::{Ingredient, Recommendation, ScorerResult, UserPreferences};
use crate::types::{AppError, AppResult};
use crate::utils::strip_json_code_fences;

pub const SCORER_APP_NAME: &str = "safebites-scorer";

#[derive(serde::Serialize)]
struct ScorePayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    ingredients: Option<&'a [Ingredient]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recommendations: Option<&'a [Recommendation]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_preferences: Option<&'a UserPreferences>,
}

pub struct ScorerAgent {
    gateway: Arc<dyn AgentGateway>,
    ingredient_agent: AgentDefinition,
    recommendation_agent: AgentDefinition,
}

impl ScorerAgent {
    pub fn new(gateway: Arc<dyn AgentGateway>) -> Self {
        Self {
            gateway,
            ingredient_agent: AgentDefinition::new(
                "ingredient_scorer_agent",
                "Scores product ingredient safety with user preferences.",
                INGREDIENT_SCORER_INSTRUCTION,
            ),
            recommendation_agent: AgentDefinition::new(
                "recommendation_scorer_agent",
                "Scores recommended alternatives with user preferences.",
                RECOMMENDATION_EVALUATOR_INSTRUCTION,
            ),
        }
    }

    pub async fn score_ingredients(
        &self,
        ingredients: &[Ingredient],
        prefs: Option<&UserPreferences>,
        cancel: &CancellationToken,
    ) -> AppResult<ScorerResult> {
        let payload = ScorePayload {
            ingredients: Some(ingredients),
            recommendations: None,
            user_preferences: prefs,
        };
        self.score(&self.ingredient_agent, &payload, cancel).await
    }

    pub async fn score_recommendations(
        &self,
        recommendations: &[Recommendation],
        prefs: Option<&UserPreferences>,
        cancel: &CancellationToken,
    ) -> AppResult<ScorerResult> {
        let payload = ScorePayload {
            ingredients: None,
            recommendations: Some(recommendations),
            user_preferences: prefs,
        };
        self.score(&self.recommendation_agent, &payload, cancel).await
    }

    async fn score(
        &self,
        agent: &AgentDefinition,
        payload: &ScorePayload<'_>,
        cancel: &CancellationToken,
    ) -> AppResult<ScorerResult> {
        let input = serde_json::to_string(payload)?;
        let raw = self.gateway.run(SCORER_APP_NAME, agent, &input, cancel).await?;

        let result: ScorerResult = serde_json::from_str(strip_json_code_fences(&raw))
            .map_err(|e| AppError::parse("parse scorer result", e))?;

        info!(
            agent = %agent.name,
            overall_score = result.overall_score,
            scored_items = result.ingredient_scores.len(),
            "Scoring finished"
        );
        Ok(result)
    }
}
