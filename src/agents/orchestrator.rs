//! Orchestrator
//!
//! Drives the search, scoring and improvement loop for one product. Each call
//! is strictly sequential; separate calls may run concurrently.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::agents::recommender::RecommenderAgent;
use crate::agents::runtime::AgentGateway;
use crate::agents::scorer::ScorerAgent;
use crate::agents::search::SearchAgent;
use crate::config::WorkflowConfig;
use crate::models::{
    LoopTurn, RecommenderResult, ScorerResult, UserPreferences, WebSearchResult, WorkflowResult,
};
use crate::types::{AppError, AppResult};

/// Workflow step currently executing; its name tags errors raised inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    Searching,
    InitialScoring,
    Recommending,
    Rescoring,
}

impl WorkflowPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowPhase::Searching => "search",
            WorkflowPhase::InitialScoring => "score",
            WorkflowPhase::Recommending => "recommend",
            WorkflowPhase::Rescoring => "rescore",
        }
    }

    fn wrap(self, error: AppError) -> AppError {
        AppError::in_phase(self.as_str(), error)
    }
}

impl std::fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Orchestrator {
    searcher: Option<SearchAgent>,
    scorer: Option<ScorerAgent>,
    recommender: Option<RecommenderAgent>,
    config: WorkflowConfig,
}

#[derive(Default)]
pub struct OrchestratorBuilder {
    searcher: Option<SearchAgent>,
    scorer: Option<ScorerAgent>,
    recommender: Option<RecommenderAgent>,
    config: WorkflowConfig,
}

impl OrchestratorBuilder {
    pub fn searcher(mut self, searcher: SearchAgent) -> Self {
        self.searcher = Some(searcher);
        self
    }

    pub fn scorer(mut self, scorer: ScorerAgent) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn recommender(mut self, recommender: RecommenderAgent) -> Self {
        self.recommender = Some(recommender);
        self
    }

    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            searcher: self.searcher,
            scorer: self.scorer,
            recommender: self.recommender,
            config: self.config.normalized(),
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> AppResult<()> {
    if cancel.is_cancelled() {
        Err(AppError::Cancelled)
    } else {
        Ok(())
    }
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// All three agents sharing one gateway
    pub fn from_gateway(gateway: Arc<dyn AgentGateway>, config: WorkflowConfig) -> Self {
        Self::builder()
            .searcher(SearchAgent::new(gateway.clone()))
            .scorer(ScorerAgent::new(gateway.clone()))
            .recommender(RecommenderAgent::new(gateway))
            .config(config)
            .build()
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    fn analysis_agents(&self) -> AppResult<(&SearchAgent, &ScorerAgent)> {
        match (&self.searcher, &self.scorer) {
            (Some(searcher), Some(scorer)) => Ok((searcher, scorer)),
            _ => Err(AppError::Configuration(
                "orchestrator requires searcher and scorer".to_string(),
            )),
        }
    }

    fn recommender(&self) -> AppResult<&RecommenderAgent> {
        self.recommender.as_ref().ok_or_else(|| {
            AppError::Configuration("orchestrator requires recommender".to_string())
        })
    }

    async fn run_analysis(
        &self,
        searcher: &SearchAgent,
        scorer: &ScorerAgent,
        product_name: &str,
        prefs: Option<&UserPreferences>,
        cancel: &CancellationToken,
    ) -> AppResult<(WebSearchResult, ScorerResult)> {
        ensure_active(cancel)?;
        info!(phase = %WorkflowPhase::Searching, product = %product_name, "Workflow step started");
        let search = searcher
            .search(product_name, cancel)
            .await
            .map_err(|e| WorkflowPhase::Searching.wrap(e))?;

        ensure_active(cancel)?;
        info!(
            phase = %WorkflowPhase::InitialScoring,
            ingredients = search.ingredients.len(),
            "Workflow step started"
        );
        let score = scorer
            .score_ingredients(&search.ingredients, prefs, cancel)
            .await
            .map_err(|e| WorkflowPhase::InitialScoring.wrap(e))?;

        info!(
            phase = %WorkflowPhase::InitialScoring,
            overall_score = score.overall_score,
            "Workflow step complete"
        );
        Ok((search, score))
    }

    /// Search and initial scoring only; no improvement loop
    pub async fn analyze_only(
        &self,
        product_name: &str,
        prefs: Option<&UserPreferences>,
        cancel: &CancellationToken,
    ) -> AppResult<(WebSearchResult, ScorerResult)> {
        let (searcher, scorer) = self.analysis_agents()?;
        info!(product = %product_name, has_prefs = prefs.is_some(), "Analysis started");

        let outcome = self
            .run_analysis(searcher, scorer, product_name, prefs, cancel)
            .await
            .inspect_err(|e| error!(product = %product_name, error = %e, "Analysis failed"))?;

        info!(product = %product_name, overall_score = outcome.1.overall_score, "Analysis complete");
        Ok(outcome)
    }

    /// Full workflow: analysis, then recommend and rescore until the
    /// threshold is met or the turn budget runs out.
    ///
    /// The latest turn's score always becomes the final score, even when it
    /// is lower than the one before it.
    pub async fn analyze_and_improve(
        &self,
        product_name: &str,
        prefs: Option<&UserPreferences>,
        cancel: &CancellationToken,
    ) -> AppResult<WorkflowResult> {
        let (searcher, scorer) = self.analysis_agents()?;
        let recommender = self.recommender()?;
        let threshold = self.config.min_acceptable_score;
        let max_turns = self.config.max_recommendation_turns;

        info!(
            product = %product_name,
            min_score = threshold,
            max_turns,
            has_prefs = prefs.is_some(),
            "Workflow started"
        );

        let (initial_search, initial_score) = self
            .run_analysis(searcher, scorer, product_name, prefs, cancel)
            .await
            .inspect_err(|e| error!(product = %product_name, stage = "initial_workflow", error = %e, "Workflow failed"))?;

        let mut result = WorkflowResult {
            initial_search,
            final_score: initial_score.clone(),
            initial_score,
            turns: Vec::new(),
        };

        if self.config.accepts(result.initial_score.overall_score) {
            info!(
                status = "accepted_without_recommendation",
                final_score = result.final_score.overall_score,
                "Workflow complete"
            );
            return Ok(result);
        }

        let mut current_score = result.initial_score.overall_score;
        for turn in 1..=max_turns {
            let (recommendations, score) = self
                .improvement_turn(recommender, scorer, product_name, current_score, prefs, cancel)
                .await
                .inspect_err(|e| error!(product = %product_name, stage = "loop_workflow", turn, error = %e, "Workflow failed"))?;

            current_score = score.overall_score;
            result.final_score = score.clone();
            result.turns.push(LoopTurn {
                recommendations,
                score,
            });
            info!(turn, overall_score = current_score, threshold, "Improvement turn complete");

            if self.config.accepts(current_score) {
                info!(turn, score = current_score, "Threshold reached, stopping early");
                break;
            }
        }

        let status = if self.config.accepts(current_score) {
            "accepted_after_recommendation"
        } else {
            "exhausted"
        };
        info!(
            status,
            turns = result.turns.len(),
            final_score = result.final_score.overall_score,
            "Workflow complete"
        );
        Ok(result)
    }

    async fn improvement_turn(
        &self,
        recommender: &RecommenderAgent,
        scorer: &ScorerAgent,
        product_name: &str,
        current_score: f64,
        prefs: Option<&UserPreferences>,
        cancel: &CancellationToken,
    ) -> AppResult<(RecommenderResult, ScorerResult)> {
        ensure_active(cancel)?;
        info!(phase = %WorkflowPhase::Recommending, product = %product_name, current_score, "Workflow step started");
        let recommendations = recommender
            .recommend(product_name, current_score, cancel)
            .await
            .map_err(|e| WorkflowPhase::Recommending.wrap(e))?;

        ensure_active(cancel)?;
        info!(
            phase = %WorkflowPhase::Rescoring,
            recommendations = recommendations.recommendations.len(),
            "Workflow step started"
        );
        let score = scorer
            .score_recommendations(&recommendations.recommendations, prefs, cancel)
            .await
            .map_err(|e| WorkflowPhase::Rescoring.wrap(e))?;

        Ok((recommendations, score))
    }

    /// Recommendations for a product with a known score, outside the loop
    pub async fn recommend(
        &self,
        product_name: &str,
        score: f64,
        cancel: &CancellationToken,
    ) -> AppResult<RecommenderResult> {
        let recommender = self.recommender()?;
        ensure_active(cancel)?;
        recommender
            .recommend(product_name, score, cancel)
            .await
            .map_err(|e| WorkflowPhase::Recommending.wrap(e))
    }
}
