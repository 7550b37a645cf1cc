use serde::{Deserialize, Serialize};

use crate::exporter::ExportConfig;
use crate::generator::GeneratorConfig;
use crate::llm::LlmProvider;
use crate::orchestrator::OrchestratorConfig;
use crate::planner::{PlannerConfig, PlannerMode};
use crate::processor::ProcessorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub planner: SanitizedPlannerConfig,
    pub generator: SanitizedGeneratorConfig,
    pub processor: ProcessorConfig,
    pub orchestrator: OrchestratorConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPlannerConfig {
    pub mode: PlannerMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<SanitizedLlmConfig>,
}

/// Sanitized LLM config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

/// Sanitized generator config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedGeneratorConfig {
    pub api_base: String,
    pub model: String,
    pub size: String,
    pub api_key_configured: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            planner: SanitizedPlannerConfig {
                mode: config.planner.mode,
                llm: config.planner.llm.as_ref().map(|l| SanitizedLlmConfig {
                    provider: l.provider,
                    model: l.model.clone(),
                    api_base: l.api_base.clone(),
                    api_key_configured: l.api_key.as_deref().is_some_and(|k| !k.is_empty()),
                    timeout_secs: l.timeout_secs,
                }),
            },
            generator: SanitizedGeneratorConfig {
                api_base: config.generator.api_base.clone(),
                model: config.generator.model.clone(),
                size: config.generator.size.clone(),
                api_key_configured: config
                    .generator
                    .api_key
                    .as_deref()
                    .is_some_and(|k| !k.is_empty()),
                timeout_secs: config.generator.timeout_secs,
            },
            processor: config.processor.clone(),
            orchestrator: config.orchestrator.clone(),
            export: config.export.clone(),
        }
    }
}
