//! Planner configuration.

use serde::{Deserialize, Serialize};

use crate::llm::LlmConfig;

/// How plans are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerMode {
    /// Compose prompts locally from the emotion table. No network, no cost.
    #[default]
    Template,
    /// Ask an LLM for a scene description per emotion.
    Llm,
}

/// Planner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub mode: PlannerMode,
    /// Required when `mode = "llm"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmProvider;

    #[test]
    fn test_default_is_template() {
        let config: PlannerConfig = toml::from_str("").unwrap();
        assert_eq!(config.mode, PlannerMode::Template);
        assert!(config.llm.is_none());
    }

    #[test]
    fn test_deserialize_llm() {
        let toml = r#"
            mode = "llm"

            [llm]
            provider = "anthropic"
            model = "claude-3-5-haiku-latest"
            api_key = "sk-test"
        "#;
        let config: PlannerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.mode, PlannerMode::Llm);
        let llm = config.llm.unwrap();
        assert_eq!(llm.provider, LlmProvider::Anthropic);
        assert_eq!(llm.api_key.as_deref(), Some("sk-test"));
    }
}
