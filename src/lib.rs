// SafeBites Agents - food product safety scoring and healthier-alternative search

pub mod agents;
pub mod config;
pub mod llm;
pub mod models;
pub mod services;
pub mod types;
pub mod utils;
pub mod vision;

// Re-exports for convenience
pub use agents::{Orchestrator, SessionGateway};
pub use config::{Config, WorkflowConfig};
pub use models::{UserPreferences, WorkflowResult};
pub use types::{AppError, AppResult};
