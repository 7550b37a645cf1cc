//! Mock sticker processor for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::processor::{ProcessedSticker, ProcessingError, StickerProcessor};

/// Lowers the running count when a call returns.
struct Running<'a>(&'a AtomicUsize);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock implementation of the StickerProcessor trait.
///
/// Output is derived from the raw bytes and caption only, so it stays
/// deterministic without touching pixels. A configured delay blocks the
/// calling thread, as real pixel work would.
#[derive(Debug, Default)]
pub struct MockProcessor {
    /// Captions that fail with `SizeBudgetExceeded`.
    failing_captions: Mutex<Vec<String>>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl MockProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail whenever the caption equals `caption`.
    pub fn fail_on_caption(&self, caption: &str) {
        self.failing_captions.lock().unwrap().push(caption.to_string());
    }

    /// Set how long each call blocks.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    /// Calls running right now.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}

impl StickerProcessor for MockProcessor {
    fn name(&self) -> &str {
        "mock"
    }

    fn process(&self, raw: &[u8], caption: &str) -> Result<ProcessedSticker, ProcessingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        let _running = Running(&self.running);
        self.max_running.fetch_max(current, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        if self
            .failing_captions
            .lock()
            .unwrap()
            .iter()
            .any(|c| c == caption)
        {
            return Err(ProcessingError::SizeBudgetExceeded {
                best_size: 200_000,
                budget: 102_400,
            });
        }

        let mut image = (raw.len() as u64).to_le_bytes().to_vec();
        image.extend_from_slice(caption.as_bytes());
        let mut thumbnail = b"thumb:".to_vec();
        thumbnail.extend_from_slice(&image);

        Ok(ProcessedSticker {
            image,
            thumbnail,
            dimension: 240,
            quality_levels: 256,
        })
    }
}
