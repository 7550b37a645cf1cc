//! LLM-powered planner.
//!
//! Asks a language model for one scene description per emotion, validates
//! the reply against a strict schema and turns it into canonical plans.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::traits::{Planner, PlanningError};
use super::types::{compose_visual_prompt, validate_request, StickerPlan};
use crate::emotion::{Emotion, EMOTION_COUNT};
use crate::llm::{extract_json, CompletionRequest, LlmClient, LlmConfig, LlmError};
use crate::metrics;

/// Configuration for the LLM planner.
#[derive(Debug, Clone)]
pub struct LlmPlannerConfig {
    /// Maximum tokens for the LLM response.
    pub max_tokens: u32,
    /// Temperature for generation.
    pub temperature: f32,
    /// Upper bound for the whole request.
    pub timeout: Duration,
}

impl Default for LlmPlannerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
        }
    }
}

/// LLM-powered planner.
///
/// Generic over the LLM client type to support different backends.
pub struct LlmPlanner<C: LlmClient> {
    client: Arc<C>,
    config: LlmPlannerConfig,
}

impl<C: LlmClient> LlmPlanner<C> {
    /// Create a new LLM planner.
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            config: LlmPlannerConfig::default(),
        }
    }

    /// Create with custom configuration.
    pub fn with_config(client: Arc<C>, config: LlmPlannerConfig) -> Self {
        Self { client, config }
    }

    /// Create from the `[planner.llm]` section.
    pub fn from_config(client: Arc<C>, llm: &LlmConfig) -> Self {
        Self::with_config(
            client,
            LlmPlannerConfig {
                max_tokens: llm.max_tokens,
                temperature: llm.temperature,
                timeout: Duration::from_secs(llm.timeout_secs as u64),
            },
        )
    }

    fn build_system_prompt(&self) -> String {
        let emotions = Emotion::ALL
            .iter()
            .map(|e| format!("- {}: {}", e.key(), e.intent()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are an art director designing a chat sticker pack. Every pack has exactly one sticker for each of these 16 emotions:

{emotions}

For each emotion, write a short visual scene description (one or two sentences) showing the requested character acting out that emotion in the requested art style. Keep the same character design across all 16 stickers. Do not describe any text or lettering in the image.

Respond with JSON only, no other text:
{{
  "stickers": [
    {{"id": 1, "emotion": "greeting", "visual_prompt": "...", "caption": "..."}}
  ]
}}

Use the emotion keys exactly as listed, in the listed order, ids 1 to 16."#
        )
    }

    fn build_user_prompt(&self, topic: &str, style: &str) -> String {
        format!(
            "Character / topic: {}\nArt style: {}\n\nDesign all {} stickers.",
            topic.trim(),
            style.trim(),
            EMOTION_COUNT
        )
    }

    /// Validate the reply and turn it into canonical plans.
    fn parse_response(
        &self,
        text: &str,
        topic: &str,
        style: &str,
    ) -> Result<Vec<StickerPlan>, PlanningError> {
        let parsed: LlmPlanResponse = serde_json::from_str(extract_json(text))
            .map_err(|e| PlanningError::Malformed(format!("invalid JSON: {}", e)))?;

        if parsed.stickers.len() != EMOTION_COUNT {
            return Err(PlanningError::Malformed(format!(
                "expected {} stickers, got {}",
                EMOTION_COUNT,
                parsed.stickers.len()
            )));
        }

        let mut scenes: [Option<String>; EMOTION_COUNT] = Default::default();
        let mut seen_ids = HashSet::new();

        for entry in parsed.stickers {
            let emotion: Emotion = entry
                .emotion
                .parse()
                .map_err(|e: crate::emotion::UnknownEmotion| PlanningError::Malformed(e.to_string()))?;

            if let Some(id) = entry.id {
                if !seen_ids.insert(id) {
                    return Err(PlanningError::Malformed(format!("duplicate id {}", id)));
                }
            }

            if entry.visual_prompt.trim().is_empty() {
                return Err(PlanningError::Malformed(format!(
                    "empty visual prompt for {}",
                    emotion
                )));
            }

            if let Some(caption) = entry.caption.as_deref() {
                if caption != emotion.caption() {
                    debug!(%emotion, caption, "Ignoring backend caption");
                }
            }

            let slot = &mut scenes[emotion.index()];
            if slot.is_some() {
                return Err(PlanningError::Malformed(format!("duplicate emotion {}", emotion)));
            }
            *slot = Some(entry.visual_prompt);
        }

        Emotion::ALL
            .iter()
            .map(|&emotion| {
                let scene = scenes[emotion.index()]
                    .as_deref()
                    .ok_or_else(|| PlanningError::Malformed(format!("missing emotion {}", emotion)))?;
                Ok(StickerPlan {
                    id: StickerPlan::id_for(emotion),
                    emotion,
                    visual_prompt: compose_visual_prompt(topic, style, emotion, Some(scene)),
                    caption: emotion.caption().to_string(),
                })
            })
            .collect()
    }
}

/// Expected JSON response from the LLM.
#[derive(Debug, Deserialize)]
struct LlmPlanResponse {
    stickers: Vec<LlmPlanEntry>,
}

#[derive(Debug, Deserialize)]
struct LlmPlanEntry {
    #[serde(default)]
    id: Option<u32>,
    emotion: String,
    #[serde(alias = "visualPrompt")]
    visual_prompt: String,
    #[serde(default)]
    caption: Option<String>,
}

#[async_trait]
impl<C: LlmClient + 'static> Planner for LlmPlanner<C> {
    fn name(&self) -> &str {
        "llm"
    }

    async fn plan(&self, topic: &str, style: &str) -> Result<Vec<StickerPlan>, PlanningError> {
        validate_request(topic, style)?;

        let request = CompletionRequest::new(self.build_user_prompt(topic, style))
            .with_system(self.build_system_prompt())
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);

        let response = tokio::time::timeout(self.config.timeout, self.client.complete(request))
            .await
            .map_err(|_| PlanningError::Timeout(self.config.timeout.as_secs()))?
            .map_err(|e| match e {
                LlmError::Timeout(d) => PlanningError::Timeout(d.as_secs()),
                other => PlanningError::Backend(other.to_string()),
            })?;

        debug!(
            provider = self.client.provider(),
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Plan response received"
        );
        let provider = self.client.provider();
        metrics::LLM_TOKENS
            .with_label_values(&[provider, "input"])
            .inc_by(response.usage.input_tokens as u64);
        metrics::LLM_TOKENS
            .with_label_values(&[provider, "output"])
            .inc_by(response.usage.output_tokens as u64);

        self.parse_response(&response.text, topic, style)
            .inspect_err(|e| warn!("Rejected plan from {}: {}", self.client.provider(), e))
    }
}
