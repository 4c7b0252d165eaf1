//! Agent System
//!
//! The agents that analyze a food product and look for healthier options:
//!
//! - **Search Agent**: finds the product's ingredient list with grounded web search
//! - **Scorer Agent**: rates ingredients (or alternatives) against user preferences
//! - **Recommender Agent**: proposes healthier products in the same category
//!
//! All of them talk to the model through the [`AgentGateway`] in `runtime`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Product name (+ preferences)
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Search    │  → List of ingredients
//! │   Agent     │
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Scorer    │  → Initial score
//! │   Agent     │
//! └─────────────┘
//!      │  score < threshold
//!      ▼
//! ┌─────────────┐      ┌─────────────┐
//! │ Recommender │  →   │   Scorer    │  → repeat up to max turns
//! │   Agent     │      │ (rescoring) │
//! └─────────────┘      └─────────────┘
//!      │
//!      ▼
//!  WorkflowResult
//! ```

pub mod orchestrator;
pub mod prompts;
pub mod recommender;
pub mod runtime;
pub mod scorer;
pub mod search;

// Re-export main components
pub use orchestrator::{Orchestrator, OrchestratorBuilder, WorkflowPhase};
pub use recommender::RecommenderAgent;
pub use runtime::{AgentDefinition, AgentGateway, AgentSession, RunIdGenerator, SessionGateway};
pub use scorer::ScorerAgent;
pub use search::SearchAgent;
