//! Mock image generator for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::fixtures;
use crate::generator::{GenerationError, ImageGenerator};

/// Lowers the in-flight count even when the call is dropped by a timeout.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock implementation of the ImageGenerator trait.
///
/// Provides controllable behavior for testing:
/// - Return a fixture raw sticker for every prompt
/// - Fail prompts containing configured substrings
/// - Simulate latency and record peak concurrency
///
/// # Example
///
/// ```rust,ignore
/// use stickerpack_core::testing::MockGenerator;
///
/// let generator = MockGenerator::new();
/// generator.fail_when_prompt_contains("bowing");
/// generator.set_delay(Duration::from_millis(20));
///
/// // ... run a pack ...
///
/// assert!(generator.max_concurrent() <= 4);
/// ```
#[derive(Debug)]
pub struct MockGenerator {
    /// Prompts received, in call order.
    prompts: Mutex<Vec<String>>,
    /// Prompts containing any of these fail.
    failures: Mutex<Vec<String>>,
    /// Simulated latency.
    delay: Mutex<Duration>,
    /// Edge length of the returned fixture.
    image_size: u32,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: AtomicUsize,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerator {
    /// Create a generator returning 64px fixtures immediately.
    pub fn new() -> Self {
        Self::with_image_size(64)
    }

    /// Create a generator returning fixtures of the given size.
    pub fn with_image_size(image_size: u32) -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            delay: Mutex::new(Duration::ZERO),
            image_size,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Fail every prompt containing `needle`.
    pub fn fail_when_prompt_contains(&self, needle: &str) {
        self.failures.lock().unwrap().push(needle.to_string());
    }

    /// Remove all configured failures.
    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Set the simulated latency of each call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Prompts received so far.
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Number of calls made.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, visual_prompt: &str) -> Result<Vec<u8>, GenerationError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(Arc::clone(&self.in_flight));
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        self.prompts.lock().unwrap().push(visual_prompt.to_string());
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let fail = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .any(|needle| visual_prompt.contains(needle.as_str()));
        if fail {
            return Err(GenerationError::Api {
                status: 500,
                message: "mock generation failure".to_string(),
            });
        }

        Ok(fixtures::raw_sticker_png(self.image_size))
    }
}
