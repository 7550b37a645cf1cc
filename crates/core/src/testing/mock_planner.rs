//! Mock planner for testing.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::planner::{Planner, PlanningError, StickerPlan, TemplatePlanner};

/// A recorded plan request for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPlan {
    pub topic: String,
    pub style: String,
}

/// Mock implementation of the Planner trait.
///
/// Delegates to [`TemplatePlanner`] unless plans or an error are configured.
#[derive(Debug, Default)]
pub struct MockPlanner {
    requests: Mutex<Vec<RecordedPlan>>,
    /// If set, every call returns a clone of these plans.
    plans: Mutex<Option<Vec<StickerPlan>>>,
    /// If set, the next call fails with this error.
    next_error: Mutex<Option<PlanningError>>,
    template: TemplatePlanner,
}

impl MockPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return these plans instead of the template output.
    pub fn set_plans(&self, plans: Vec<StickerPlan>) {
        *self.plans.lock().unwrap() = Some(plans);
    }

    /// Configure the next call to fail with the given error.
    pub fn set_next_error(&self, error: PlanningError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    /// Requests received so far.
    pub fn recorded_requests(&self) -> Vec<RecordedPlan> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Planner for MockPlanner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn plan(&self, topic: &str, style: &str) -> Result<Vec<StickerPlan>, PlanningError> {
        self.requests.lock().unwrap().push(RecordedPlan {
            topic: topic.to_string(),
            style: style.to_string(),
        });

        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }
        let configured = self.plans.lock().unwrap().clone();
        match configured {
            Some(plans) => Ok(plans),
            None => self.template.plan(topic, style).await,
        }
    }
}
