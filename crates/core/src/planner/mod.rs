//! Planner: turns a topic/style request into a pack of sticker plans.
//!
//! Two implementations share the [`Planner`] trait:
//! - [`TemplatePlanner`]: offline, deterministic prompt composition
//! - [`LlmPlanner`]: asks a language model for per-emotion scene descriptions
//!
//! Whatever the backend says, plans come out in canonical emotion order with
//! ids `1..=16` and captions from the static emotion table.

mod config;
mod llm_planner;
mod template;
mod traits;
mod types;

pub use config::{PlannerConfig, PlannerMode};
pub use llm_planner::LlmPlanner;
pub use template::TemplatePlanner;
pub use traits::{Planner, PlanningError};
pub use types::{compose_visual_prompt, validate_request, StickerPlan};

use std::sync::Arc;
use tracing::info;

use crate::llm::{create_llm_client, AnyLlmClient};

/// Build the planner selected by `config`.
pub fn create_planner(config: &PlannerConfig) -> Result<Arc<dyn Planner>, PlanningError> {
    match config.mode {
        PlannerMode::Template => {
            info!("Using template planner");
            Ok(Arc::new(TemplatePlanner::new()))
        }
        PlannerMode::Llm => {
            let llm_config = config.llm.as_ref().ok_or_else(|| {
                PlanningError::NotConfigured("planner.mode = \"llm\" requires [planner.llm]".to_string())
            })?;
            let client = create_llm_client(llm_config)
                .map_err(|e| PlanningError::NotConfigured(e.to_string()))?;
            info!(
                "Using LLM planner ({:?}, model {})",
                llm_config.provider, llm_config.model
            );
            let planner: Arc<dyn Planner> = match client {
                AnyLlmClient::Anthropic(c) => Arc::new(LlmPlanner::from_config(c, llm_config)),
                AnyLlmClient::Ollama(c) => Arc::new(LlmPlanner::from_config(c, llm_config)),
            };
            Ok(planner)
        }
    }
}
