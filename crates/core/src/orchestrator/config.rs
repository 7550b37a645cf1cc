//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the pack orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Stickers generated concurrently. The next batch starts only after
    /// every item of the current one has settled.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Upper bound for one generator call (milliseconds).
    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_ms: u64,

    /// Upper bound for processing one sticker (milliseconds).
    #[serde(default = "default_processing_timeout")]
    pub processing_timeout_ms: u64,

    /// Capacity of the event broadcast channel. Slow subscribers that fall
    /// further behind than this miss events.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_batch_size() -> usize {
    4
}

fn default_generation_timeout() -> u64 {
    180_000 // 3 minutes
}

fn default_processing_timeout() -> u64 {
    60_000 // 1 minute
}

fn default_event_buffer() -> usize {
    256
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            generation_timeout_ms: default_generation_timeout(),
            processing_timeout_ms: default_processing_timeout(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_timeouts(mut self, generation: Duration, processing: Duration) -> Self {
        self.generation_timeout_ms = generation.as_millis() as u64;
        self.processing_timeout_ms = processing.as_millis() as u64;
        self
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_millis(self.processing_timeout_ms)
    }

    /// Checks internal consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("orchestrator.batch_size must be at least 1".to_string());
        }
        if self.generation_timeout_ms == 0 || self.processing_timeout_ms == 0 {
            return Err("orchestrator timeouts must be positive".to_string());
        }
        if self.event_buffer == 0 {
            return Err("orchestrator.event_buffer must be at least 1".to_string());
        }
        Ok(())
    }
}
