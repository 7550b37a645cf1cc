//! Offline planner that composes prompts from the emotion table.

use async_trait::async_trait;
use tracing::debug;

use super::traits::{Planner, PlanningError};
use super::types::{compose_visual_prompt, validate_request, StickerPlan};
use crate::emotion::Emotion;

/// Deterministic planner: same topic/style, same plans.
#[derive(Debug, Default, Clone)]
pub struct TemplatePlanner;

impl TemplatePlanner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Planner for TemplatePlanner {
    fn name(&self) -> &str {
        "template"
    }

    async fn plan(&self, topic: &str, style: &str) -> Result<Vec<StickerPlan>, PlanningError> {
        validate_request(topic, style)?;
        debug!(topic, style, "Composing template plans");

        Ok(Emotion::ALL
            .iter()
            .map(|&emotion| StickerPlan {
                id: StickerPlan::id_for(emotion),
                emotion,
                visual_prompt: compose_visual_prompt(topic, style, emotion, None),
                caption: emotion.caption().to_string(),
            })
            .collect())
    }
}
