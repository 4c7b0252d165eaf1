use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

pub const DEFAULT_MIN_ACCEPTABLE_SCORE: f64 = 7.0;
pub const DEFAULT_MAX_RECOMMENDATION_TURNS: i64 = 2;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub llm: LLMConfig,
    pub workflow: WorkflowConfig,
}

#[derive(Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: String,
    pub google_api_key: String,
    pub model: String,
    pub api_base: String,
}

// Keep the API key out of logs
impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("provider", &self.provider)
            .field("google_api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Termination policy of the improvement loop
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WorkflowConfig {
    pub min_acceptable_score: f64,
    pub max_recommendation_turns: i64,
}

impl WorkflowConfig {
    /// Build a config, replacing non-positive values with the defaults
    pub fn new(min_acceptable_score: f64, max_recommendation_turns: i64) -> Self {
        Self {
            min_acceptable_score,
            max_recommendation_turns,
        }
        .normalized()
    }

    pub fn normalized(self) -> Self {
        let min_acceptable_score =
            if self.min_acceptable_score.is_finite() && self.min_acceptable_score > 0.0 {
                self.min_acceptable_score
            } else {
                DEFAULT_MIN_ACCEPTABLE_SCORE
            };
        let max_recommendation_turns = if self.max_recommendation_turns > 0 {
            self.max_recommendation_turns
        } else {
            DEFAULT_MAX_RECOMMENDATION_TURNS
        };

        Self {
            min_acceptable_score,
            max_recommendation_turns,
        }
    }

    /// Whether a score crosses the acceptance threshold (inclusive)
    pub fn accepts(&self, overall_score: f64) -> bool {
        overall_score >= self.min_acceptable_score
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            min_acceptable_score: DEFAULT_MIN_ACCEPTABLE_SCORE,
            max_recommendation_turns: DEFAULT_MAX_RECOMMENDATION_TURNS,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let google_api_key = var("GOOGLE_API_KEY").context("GOOGLE_API_KEY must be set")?;

        let min_acceptable_score = match var("MIN_ACCEPTABLE_SCORE") {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .with_context(|| format!("MIN_ACCEPTABLE_SCORE is not a number: {}", raw))?,
            None => DEFAULT_MIN_ACCEPTABLE_SCORE,
        };
        let max_recommendation_turns = match var("MAX_RECOMMENDATION_TURNS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .with_context(|| format!("MAX_RECOMMENDATION_TURNS is not an integer: {}", raw))?,
            None => DEFAULT_MAX_RECOMMENDATION_TURNS,
        };

        Ok(Self {
            llm: LLMConfig {
                provider: var("LLM_PROVIDER").unwrap_or_else(|| "google".to_string()),
                google_api_key: google_api_key.trim().to_string(),
                model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                api_base: var("GEMINI_API_BASE")
                    .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            },
            workflow: WorkflowConfig::new(min_acceptable_score, max_recommendation_turns),
        })
    }
}
