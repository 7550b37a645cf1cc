use super::{types::Config, ConfigError};
use crate::planner::PlannerMode;

/// Validate configuration
/// Currently validates:
/// - Each section's own consistency rules
/// - LLM planning has an `[planner.llm]` section
/// - Generator has an API base
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.planner.mode == PlannerMode::Llm && config.planner.llm.is_none() {
        return Err(ConfigError::ValidationError(
            "planner.mode = \"llm\" requires a [planner.llm] section".to_string(),
        ));
    }

    if config.generator.api_base.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "generator.api_base cannot be empty".to_string(),
        ));
    }

    config
        .processor
        .validate()
        .map_err(|e| ConfigError::ValidationError(format!("processor: {}", e)))?;
    config
        .orchestrator
        .validate()
        .map_err(ConfigError::ValidationError)?;
    config.export.validate().map_err(ConfigError::ValidationError)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::OrchestratorConfig;
    use crate::processor::ProcessorConfig;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_batch_size_zero_fails() {
        let config = Config {
            orchestrator: OrchestratorConfig::default().with_batch_size(0),
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(msg)) if msg.contains("batch_size")));
    }

    #[test]
    fn test_validate_thumbnail_not_smaller_fails() {
        let config = Config {
            processor: ProcessorConfig::default().with_sizes(120, 120),
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(msg)) if msg.starts_with("processor:")));
    }

    #[test]
    fn test_validate_zero_budget_fails() {
        let config = Config {
            processor: ProcessorConfig::default().with_max_bytes(0),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_llm_mode_without_section_fails() {
        let mut config = Config::default();
        config.planner.mode = PlannerMode::Llm;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(msg)) if msg.contains("[planner.llm]")));
    }
}
