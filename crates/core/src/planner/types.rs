//! Plan types and prompt composition.

use serde::{Deserialize, Serialize};

use super::traits::PlanningError;
use crate::emotion::Emotion;

/// The text description of one sticker, before any image exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickerPlan {
    /// Unique within a pack, `1..=16` in canonical order.
    pub id: u32,
    pub emotion: Emotion,
    /// Prompt handed to the image generator.
    pub visual_prompt: String,
    /// Caption baked into the final image.
    pub caption: String,
}

impl StickerPlan {
    /// Id a plan for `emotion` gets inside a pack.
    pub fn id_for(emotion: Emotion) -> u32 {
        emotion.index() as u32 + 1
    }
}

/// Reject blank topics or styles before any backend is called.
pub fn validate_request(topic: &str, style: &str) -> Result<(), PlanningError> {
    if topic.trim().is_empty() {
        return Err(PlanningError::InvalidRequest("topic is empty".to_string()));
    }
    if style.trim().is_empty() {
        return Err(PlanningError::InvalidRequest("style is empty".to_string()));
    }
    Ok(())
}

/// Builds the generator prompt for one sticker.
///
/// Topic, style and the emotion's intent are always present, whatever scene
/// detail a backend contributed. The trailing guidance keeps the subject on a
/// flat light background, which background removal relies on, and keeps the
/// model from drawing its own text.
pub fn compose_visual_prompt(topic: &str, style: &str, emotion: Emotion, scene: Option<&str>) -> String {
    let mut prompt = format!(
        "A {} style sticker of {}, {}",
        style.trim(),
        topic.trim(),
        emotion.intent()
    );
    if let Some(scene) = scene.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str(". ");
        prompt.push_str(scene.trim_end_matches('.'));
    }
    prompt.push_str(
        ". Single character, centered, bold clean outlines, expressive pose, \
         plain solid white background, no text, no letters, no watermark.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_for_is_one_based_canonical() {
        assert_eq!(StickerPlan::id_for(Emotion::Greeting), 1);
        assert_eq!(StickerPlan::id_for(Emotion::Speechless), 16);
    }

    #[test]
    fn test_validate_request() {
        assert!(validate_request("cat", "pixel art").is_ok());
        assert!(matches!(
            validate_request("  ", "pixel art"),
            Err(PlanningError::InvalidRequest(_))
        ));
        assert!(matches!(
            validate_request("cat", ""),
            Err(PlanningError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_compose_embeds_topic_style_intent() {
        let prompt = compose_visual_prompt("shiba inu", "chibi", Emotion::Love, None);
        assert!(prompt.contains("shiba inu"));
        assert!(prompt.contains("chibi"));
        assert!(prompt.contains(Emotion::Love.intent()));
        assert!(prompt.contains("white background"));
    }

    #[test]
    fn test_compose_appends_scene() {
        let prompt = compose_visual_prompt(
            "shiba inu",
            "chibi",
            Emotion::Happy,
            Some("rolling on grass with a ball."),
        );
        assert!(prompt.contains("rolling on grass with a ball. Single character"));
    }
}
