//! Planner trait and errors.

use async_trait::async_trait;
use thiserror::Error;

use super::types::StickerPlan;

/// Errors that abort planning. Planning is all-or-nothing.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// Topic or style missing.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Backend request failed.
    #[error("planning backend failed: {0}")]
    Backend(String),

    /// Backend did not answer in time.
    #[error("planning timed out after {0} seconds")]
    Timeout(u64),

    /// Backend answered with the wrong shape.
    #[error("malformed plan: {0}")]
    Malformed(String),

    /// Planner cannot be built from the given configuration.
    #[error("planner not configured: {0}")]
    NotConfigured(String),
}

/// Produces one plan per emotion for a topic/style pair.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Implementation name, for logs.
    fn name(&self) -> &str;

    /// Plan a full pack. On success the result holds exactly one plan per
    /// emotion, in canonical order.
    async fn plan(&self, topic: &str, style: &str) -> Result<Vec<StickerPlan>, PlanningError>;
}
