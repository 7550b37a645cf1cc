//! Pack orchestrator implementation.
//!
//! Drives every sticker of a pack through the state machine:
//! - Planning: one call, all-or-nothing
//! - Generation + processing: bounded batches, failures isolated per sticker
//! - Edits and regenerations: one sticker at a time, never twice concurrently

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::exporter::{ExportedPack, PackExporter};
use crate::generator::{GenerationError, ImageGenerator};
use crate::metrics;
use crate::planner::Planner;
use crate::processor::{ProcessedSticker, ProcessingError, StickerProcessor};

use super::config::OrchestratorConfig;
use super::types::{
    OrchestratorError, PackEvent, PackSummary, StickerRecord, StickerStatus, StickerUpdate,
};

/// Authoritative pack state. Every record mutation goes through the
/// orchestrator's lock on this struct.
#[derive(Debug, Default)]
struct PackState {
    /// Bumped by every `generate_pack`; chains from older epochs are stale.
    epoch: u64,
    pack_id: Option<Uuid>,
    records: Vec<StickerRecord>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Ids with a generate/process chain running, tagged with the epoch that
/// claimed them.
///
/// Kept behind a plain mutex so a claim can be released from `Drop` when
/// the owning future is cancelled.
#[derive(Debug, Default)]
struct InFlight(Mutex<HashMap<u32, u64>>);

impl InFlight {
    fn contains(&self, id: u32) -> bool {
        lock(&self.0).contains_key(&id)
    }

    fn claim(&self, id: u32, epoch: u64) -> bool {
        let mut claims = lock(&self.0);
        if claims.contains_key(&id) {
            return false;
        }
        claims.insert(id, epoch);
        metrics::STICKERS_IN_FLIGHT.inc();
        true
    }

    /// Release `id` if it is still held by `epoch`.
    fn release(&self, id: u32, epoch: u64) {
        let mut claims = lock(&self.0);
        if claims.get(&id) == Some(&epoch) {
            claims.remove(&id);
            metrics::STICKERS_IN_FLIGHT.dec();
        }
    }

    fn clear(&self) {
        let mut claims = lock(&self.0);
        metrics::STICKERS_IN_FLIGHT.sub(claims.len() as i64);
        claims.clear();
    }
}

/// Releases a claim when the chain ends, however it ends.
struct Claim<'a> {
    in_flight: &'a InFlight,
    id: u32,
    epoch: u64,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.in_flight.release(self.id, self.epoch);
    }
}

/// Count of running operations behind the pack-level "processing" flag.
///
/// Transitions are broadcast while the count is locked, so subscribers see
/// `true` and `false` strictly alternating.
#[derive(Debug)]
struct Activity {
    running: Mutex<usize>,
    events: broadcast::Sender<PackEvent>,
}

impl Activity {
    fn is_active(&self) -> bool {
        *lock(&self.running) > 0
    }
}

/// Keeps the pack-level "processing" flag raised while alive.
struct ProcessingGuard {
    activity: Arc<Activity>,
}

impl ProcessingGuard {
    fn new(activity: Arc<Activity>) -> Self {
        {
            let mut running = lock(&activity.running);
            if *running == 0 {
                let _ = activity.events.send(PackEvent::ProcessingChanged(true));
            }
            *running += 1;
        }
        Self { activity }
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        let mut running = lock(&self.activity.running);
        *running = running.saturating_sub(1);
        if *running == 0 {
            let _ = self.activity.events.send(PackEvent::ProcessingChanged(false));
        }
    }
}

/// Outcome of one processor run.
struct Processed {
    result: Result<ProcessedSticker, String>,
    /// A timed-out task that is still burning a blocking thread.
    straggler: Option<JoinHandle<Result<ProcessedSticker, ProcessingError>>>,
}

/// The pack orchestrator - owns the sticker records of the active pack.
pub struct PackOrchestrator {
    config: OrchestratorConfig,
    planner: Arc<dyn Planner>,
    generator: Arc<dyn ImageGenerator>,
    processor: Arc<dyn StickerProcessor>,
    exporter: PackExporter,

    // Runtime state
    state: RwLock<PackState>,
    in_flight: InFlight,
    activity: Arc<Activity>,
    events: broadcast::Sender<PackEvent>,
}

impl PackOrchestrator {
    /// Create a new orchestrator with an empty pack.
    pub fn new(
        config: OrchestratorConfig,
        planner: Arc<dyn Planner>,
        generator: Arc<dyn ImageGenerator>,
        processor: Arc<dyn StickerProcessor>,
        exporter: PackExporter,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));

        Self {
            config,
            planner,
            generator,
            processor,
            exporter,
            state: RwLock::new(PackState::default()),
            in_flight: InFlight::default(),
            activity: Arc::new(Activity {
                running: Mutex::new(0),
                events: events.clone(),
            }),
            events,
        }
    }

    /// Subscribe to pack events.
    pub fn subscribe(&self) -> broadcast::Receiver<PackEvent> {
        self.events.subscribe()
    }

    /// Whether any pack generation, edit or regeneration is running.
    pub fn is_processing(&self) -> bool {
        self.activity.is_active()
    }

    /// Snapshot of every record in the active pack, in pack order.
    pub async fn records(&self) -> Vec<StickerRecord> {
        self.state.read().await.records.clone()
    }

    /// Snapshot of one record.
    pub async fn record(&self, id: u32) -> Option<StickerRecord> {
        self.state
            .read()
            .await
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Id of the active pack, if one was ever planned.
    pub async fn pack_id(&self) -> Option<Uuid> {
        self.state.read().await.pack_id
    }

    /// Counts by status for the active pack.
    pub async fn summary(&self) -> PackSummary {
        let state = self.state.read().await;
        PackSummary::from_records(state.pack_id, &state.records)
    }

    /// Plan a new pack and run every sticker through generation and processing.
    ///
    /// The previous pack is discarded immediately. A planning failure leaves
    /// the pack empty and is returned; per-sticker failures only mark that
    /// sticker `Error`.
    pub async fn generate_pack(
        &self,
        topic: &str,
        style: &str,
    ) -> Result<PackSummary, OrchestratorError> {
        let _processing = self.begin_processing();

        let (epoch, pack_id) = {
            let mut state = self.state.write().await;
            state.epoch += 1;
            let pack_id = Uuid::new_v4();
            state.pack_id = Some(pack_id);
            state.records.clear();
            self.in_flight.clear();
            (state.epoch, pack_id)
        };
        info!(%pack_id, topic, style, planner = self.planner.name(), "Generating sticker pack");

        let start = Instant::now();
        let plans = match self.planner.plan(topic, style).await {
            Ok(plans) => {
                metrics::PLANNING_DURATION
                    .with_label_values(&[self.planner.name(), "success"])
                    .observe(start.elapsed().as_secs_f64());
                plans
            }
            Err(e) => {
                metrics::PLANNING_DURATION
                    .with_label_values(&[self.planner.name(), "failed"])
                    .observe(start.elapsed().as_secs_f64());
                metrics::PACKS_TOTAL.with_label_values(&["failed"]).inc();
                error!(%pack_id, "Planning failed: {}", e);
                self.emit(PackEvent::PackFailed {
                    pack_id,
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let ids: Vec<u32> = {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                warn!(%pack_id, "Pack superseded before seeding");
                return Ok(PackSummary::from_records(state.pack_id, &state.records));
            }
            state.records = plans.into_iter().map(StickerRecord::from_plan).collect();
            let ids: Vec<u32> = state.records.iter().map(|r| r.id).collect();
            self.emit(PackEvent::PackSeeded {
                pack_id,
                ids: ids.clone(),
            });
            ids
        };
        debug!(%pack_id, stickers = ids.len(), "Records seeded");

        let batch_size = self.config.batch_size.max(1);
        for (batch_idx, batch) in ids.chunks(batch_size).enumerate() {
            if self.state.read().await.epoch != epoch {
                warn!(%pack_id, "Pack superseded, abandoning remaining batches");
                break;
            }
            debug!(%pack_id, batch = batch_idx, ids = ?batch, "Starting batch");
            join_all(batch.iter().map(|&id| self.run_batch_item(epoch, id))).await;
        }

        let (current, summary) = {
            let state = self.state.read().await;
            (
                state.epoch == epoch,
                PackSummary::from_records(state.pack_id, &state.records),
            )
        };
        if !current {
            return Ok(summary);
        }
        metrics::PACKS_TOTAL.with_label_values(&["completed"]).inc();
        info!(
            %pack_id,
            complete = summary.complete,
            failed = summary.failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pack finished"
        );
        self.emit(PackEvent::PackFinished(summary.clone()));
        Ok(summary)
    }

    /// Replace one sticker's caption and re-process its existing raw image.
    ///
    /// Returns the updated record; a processing failure leaves it in `Error`
    /// with the new caption kept.
    pub async fn edit_caption(
        &self,
        id: u32,
        caption: &str,
    ) -> Result<StickerRecord, OrchestratorError> {
        let _processing = self.begin_processing();

        let (epoch, raw, _claim) = {
            let mut state = self.state.write().await;
            let epoch = state.epoch;
            let record = state
                .records
                .iter()
                .find(|r| r.id == id)
                .ok_or(OrchestratorError::StickerNotFound(id))?;
            if self.in_flight.contains(id) {
                return Err(OrchestratorError::AlreadyInFlight(id));
            }
            let raw = record
                .raw_image
                .clone()
                .ok_or(OrchestratorError::MissingRawImage(id))?;

            let claim = self.claim(epoch, id).ok_or(OrchestratorError::AlreadyInFlight(id))?;
            let caption = caption.to_string();
            self.apply(&mut state, id, |r| {
                r.caption = caption;
                r.status = StickerStatus::Processing;
                r.processed = None;
                r.error = None;
            });
            (epoch, raw, claim)
        };
        info!(id, caption, "Editing caption");

        let processed = self.process_image(raw, caption.to_string()).await;
        self.finish(epoch, id, "edit", processed)
            .await
            .ok_or(OrchestratorError::Superseded(id))
    }

    /// Re-run generation and processing for one sticker from scratch.
    pub async fn regenerate(&self, id: u32) -> Result<StickerRecord, OrchestratorError> {
        let _processing = self.begin_processing();

        let (epoch, _claim) = {
            let state = self.state.write().await;
            if !state.records.iter().any(|r| r.id == id) {
                return Err(OrchestratorError::StickerNotFound(id));
            }
            let claim = self
                .claim(state.epoch, id)
                .ok_or(OrchestratorError::AlreadyInFlight(id))?;
            (state.epoch, claim)
        };
        info!(id, "Regenerating sticker");

        self.run_chain(epoch, id, "regenerate")
            .await
            .ok_or(OrchestratorError::Superseded(id))
    }

    /// Archive every complete sticker of the active pack.
    pub async fn export(&self) -> Result<ExportedPack, OrchestratorError> {
        let records = self.records().await;
        match self.exporter.export(&records) {
            Ok(pack) => {
                self.emit(PackEvent::ExportCompleted {
                    sticker_count: pack.sticker_count,
                    bytes: pack.bytes.len(),
                });
                Ok(pack)
            }
            Err(e) => {
                self.emit(PackEvent::ExportFailed {
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    fn begin_processing(&self) -> ProcessingGuard {
        ProcessingGuard::new(Arc::clone(&self.activity))
    }

    fn emit(&self, event: PackEvent) {
        // Err only means nobody is subscribed
        let _ = self.events.send(event);
    }

    /// Claim `id` for one chain; `None` if another chain holds it.
    fn claim(&self, epoch: u64, id: u32) -> Option<Claim<'_>> {
        self.in_flight.claim(id, epoch).then(|| Claim {
            in_flight: &self.in_flight,
            id,
            epoch,
        })
    }

    /// Mutate one record and broadcast the result while the lock is held.
    fn apply<F>(&self, state: &mut PackState, id: u32, f: F) -> Option<StickerRecord>
    where
        F: FnOnce(&mut StickerRecord),
    {
        let pack_id = state.pack_id?;
        let record = state.records.iter_mut().find(|r| r.id == id)?;
        f(record);
        record.updated_at = Utc::now();

        let snapshot = record.clone();
        debug!(id, status = %snapshot.status, "Sticker updated");
        self.emit(PackEvent::StickerUpdated(StickerUpdate {
            pack_id,
            id,
            status: snapshot.status,
            image: snapshot.processed.clone(),
            error: snapshot.error.clone(),
        }));
        Some(snapshot)
    }

    /// Apply an update unless the pack was superseded since `epoch`.
    async fn update<F>(&self, epoch: u64, id: u32, f: F) -> Option<StickerRecord>
    where
        F: FnOnce(&mut StickerRecord),
    {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            debug!(id, "Discarding update from superseded pack");
            return None;
        }
        self.apply(&mut state, id, f)
    }

    /// Batch entry point: only stickers still `Pending` and unclaimed run.
    async fn run_batch_item(&self, epoch: u64, id: u32) {
        let _claim = {
            let state = self.state.write().await;
            if state.epoch != epoch {
                return;
            }
            let pending = state
                .records
                .iter()
                .any(|r| r.id == id && r.status == StickerStatus::Pending);
            let claim = if pending { self.claim(epoch, id) } else { None };
            match claim {
                Some(claim) => claim,
                None => {
                    debug!(id, "Skipping sticker already handled elsewhere");
                    return;
                }
            }
        };
        self.run_chain(epoch, id, "generate").await;
    }

    /// Generator then processor for one claimed sticker. `None` means the
    /// pack was replaced mid-chain.
    async fn run_chain(
        &self,
        epoch: u64,
        id: u32,
        operation: &'static str,
    ) -> Option<StickerRecord> {
        let started = self
            .update(epoch, id, |r| {
                r.status = StickerStatus::Generating;
                r.raw_image = None;
                r.processed = None;
                r.error = None;
            })
            .await?;

        let raw = match self.generate_image(&started.visual_prompt).await {
            Ok(bytes) => Arc::new(bytes),
            Err(e) => {
                warn!(id, emotion = %started.emotion, "Generation failed: {}", e);
                return self.settle(epoch, id, operation, Err(e.to_string())).await;
            }
        };

        let raw_for_record = Arc::clone(&raw);
        self.update(epoch, id, move |r| {
            r.raw_image = Some(raw_for_record);
            r.status = StickerStatus::Processing;
        })
        .await?;

        let processed = self.process_image(raw, started.caption.clone()).await;
        self.finish(epoch, id, operation, processed).await
    }

    /// Settle a processed chain, then wait out any timed-out processor task
    /// so the caller's slot is not freed while it still runs.
    async fn finish(
        &self,
        epoch: u64,
        id: u32,
        operation: &'static str,
        processed: Processed,
    ) -> Option<StickerRecord> {
        let settled = self.settle(epoch, id, operation, processed.result).await;
        if let Some(task) = processed.straggler {
            debug!(id, "Waiting for timed-out processing task");
            if let Err(e) = task.await {
                warn!(id, "Timed-out processing task failed: {}", e);
            }
        }
        settled
    }

    /// Record the terminal state of a chain and release its claim.
    async fn settle(
        &self,
        epoch: u64,
        id: u32,
        operation: &'static str,
        outcome: Result<ProcessedSticker, String>,
    ) -> Option<StickerRecord> {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            debug!(id, "Discarding result from superseded pack");
            return None;
        }
        self.in_flight.release(id, epoch);

        let result = if outcome.is_ok() { "complete" } else { "error" };
        metrics::STICKER_OUTCOMES
            .with_label_values(&[operation, result])
            .inc();

        let settled = self.apply(&mut state, id, |r| match outcome {
            Ok(sticker) => {
                r.status = StickerStatus::Complete;
                r.processed = Some(Arc::new(sticker));
                r.error = None;
            }
            Err(message) => {
                r.status = StickerStatus::Error;
                r.processed = None;
                r.error = Some(message);
            }
        });
        if let Some(record) = &settled {
            info!(id, emotion = %record.emotion, status = %record.status, operation, "Sticker settled");
        }
        settled
    }

    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, GenerationError> {
        let timeout = self.config.generation_timeout();
        let start = Instant::now();

        let result = match tokio::time::timeout(timeout, self.generator.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(timeout.as_secs())),
        };

        let label = if result.is_ok() { "success" } else { "failed" };
        metrics::GENERATION_DURATION
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());
        result
    }

    async fn process_image(&self, raw: Arc<Vec<u8>>, caption: String) -> Processed {
        let timeout = self.config.processing_timeout();
        let processor = Arc::clone(&self.processor);
        let mut task = tokio::task::spawn_blocking(move || processor.process(&raw, &caption));

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(joined) => Processed {
                result: match joined {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(join_error) => Err(format!("processing task failed: {}", join_error)),
                },
                straggler: None,
            },
            Err(_) => Processed {
                result: Err(ProcessingError::Timeout(timeout).to_string()),
                straggler: Some(task),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::{Emotion, EMOTION_COUNT};
    use crate::planner::PlanningError;
    use crate::testing::{fixtures, MockGenerator, MockPlanner, MockProcessor};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts chains open between generator start and processor end.
    #[derive(Default)]
    struct ChainTracker {
        open: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ImageGenerator for ChainTracker {
        fn name(&self) -> &str {
            "chain"
        }

        async fn generate(&self, _visual_prompt: &str) -> Result<Vec<u8>, GenerationError> {
            let open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(open, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(fixtures::raw_sticker_png(16))
        }
    }

    impl StickerProcessor for ChainTracker {
        fn name(&self) -> &str {
            "chain"
        }

        fn process(&self, raw: &[u8], caption: &str) -> Result<ProcessedSticker, ProcessingError> {
            std::thread::sleep(Duration::from_millis(60));
            self.open.fetch_sub(1, Ordering::SeqCst);
            Ok(ProcessedSticker {
                image: raw.to_vec(),
                thumbnail: caption.as_bytes().to_vec(),
                dimension: 240,
                quality_levels: 256,
            })
        }
    }

    struct Harness {
        orchestrator: Arc<PackOrchestrator>,
        planner: Arc<MockPlanner>,
        generator: Arc<MockGenerator>,
        processor: Arc<MockProcessor>,
    }

    fn harness(config: OrchestratorConfig) -> Harness {
        let planner = Arc::new(MockPlanner::new());
        let generator = Arc::new(MockGenerator::new());
        let processor = Arc::new(MockProcessor::new());
        let orchestrator = Arc::new(PackOrchestrator::new(
            config,
            planner.clone(),
            generator.clone(),
            processor.clone(),
            PackExporter::default(),
        ));
        Harness {
            orchestrator,
            planner,
            generator,
            processor,
        }
    }

    fn drain(rx: &mut broadcast::Receiver<PackEvent>) -> Vec<PackEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_generate_pack_completes_every_sticker() {
        let h = harness(OrchestratorConfig::default());
        let summary = h.orchestrator.generate_pack("panda", "chibi").await.unwrap();

        assert_eq!(summary.total, EMOTION_COUNT);
        assert_eq!(summary.complete, EMOTION_COUNT);
        assert_eq!(summary.failed, 0);

        let records = h.orchestrator.records().await;
        for (idx, record) in records.iter().enumerate() {
            assert_eq!(record.id, idx as u32 + 1);
            assert_eq!(record.emotion, Emotion::ALL[idx]);
            assert_eq!(record.status, StickerStatus::Complete);
            assert!(record.raw_image.is_some());
            assert!(record.processed.is_some());
        }
        assert_eq!(h.generator.call_count(), EMOTION_COUNT);
        assert_eq!(h.processor.call_count(), EMOTION_COUNT);
        assert!(!h.orchestrator.is_processing());
    }

    #[tokio::test]
    async fn test_planner_failure_leaves_pack_empty() {
        let h = harness(OrchestratorConfig::default());
        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();

        h.planner
            .set_next_error(PlanningError::Backend("model unavailable".to_string()));
        let mut rx = h.orchestrator.subscribe();
        let result = h.orchestrator.generate_pack("tiger", "pixel").await;

        assert!(matches!(result, Err(OrchestratorError::Planning(_))));
        assert!(h.orchestrator.records().await.is_empty());
        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, PackEvent::PackFailed { error, .. } if error.contains("model unavailable"))));
        assert!(!h.orchestrator.is_processing());
    }

    #[tokio::test]
    async fn test_generation_failure_is_isolated() {
        let h = harness(OrchestratorConfig::default());
        h.generator.fail_when_prompt_contains("bowing gratefully");

        let summary = h.orchestrator.generate_pack("panda", "chibi").await.unwrap();
        assert_eq!(summary.complete, EMOTION_COUNT - 1);
        assert_eq!(summary.failed, 1);

        let thanks = h.orchestrator.record(2).await.unwrap();
        assert_eq!(thanks.emotion, Emotion::Thanks);
        assert_eq!(thanks.status, StickerStatus::Error);
        assert!(thanks.raw_image.is_none());
        assert!(thanks.error.is_some());
    }

    #[tokio::test]
    async fn test_processing_failure_keeps_raw_image() {
        let h = harness(OrchestratorConfig::default());
        h.processor.fail_on_caption("生气");

        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();
        let angry = h.orchestrator.record(8).await.unwrap();
        assert_eq!(angry.status, StickerStatus::Error);
        assert!(angry.raw_image.is_some());
        assert!(angry.processed.is_none());
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_batch_size() {
        let h = harness(OrchestratorConfig::default().with_batch_size(3));
        h.generator.set_delay(Duration::from_millis(20));
        h.processor.set_delay(Duration::from_millis(20));

        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();
        assert_eq!(h.generator.max_concurrent(), 3);
        assert!(h.processor.max_concurrent() <= 3);
    }

    #[tokio::test]
    async fn test_processing_timeout_keeps_batch_slot_until_task_ends() {
        let config = OrchestratorConfig::default()
            .with_batch_size(2)
            .with_timeouts(Duration::from_secs(5), Duration::from_millis(20));
        let h = harness(config);
        h.processor.set_delay(Duration::from_millis(120));

        let summary = h.orchestrator.generate_pack("cat", "flat").await.unwrap();
        assert_eq!(summary.failed, EMOTION_COUNT);
        assert!(h.processor.max_concurrent() <= 2);
        assert_eq!(h.processor.running(), 0);

        let record = h.orchestrator.record(1).await.unwrap();
        assert_eq!(record.status, StickerStatus::Error);
        assert!(record.error.unwrap().contains("timed out"));
        assert!(record.raw_image.is_some());
    }

    #[tokio::test]
    async fn test_open_chains_bounded_across_batches() {
        let tracker = Arc::new(ChainTracker::default());
        let config = OrchestratorConfig::default()
            .with_batch_size(2)
            .with_timeouts(Duration::from_secs(5), Duration::from_millis(10));
        let orchestrator = PackOrchestrator::new(
            config,
            Arc::new(MockPlanner::new()),
            tracker.clone(),
            tracker.clone(),
            PackExporter::default(),
        );

        let summary = orchestrator.generate_pack("cat", "flat").await.unwrap();
        assert_eq!(summary.failed, EMOTION_COUNT);
        assert_eq!(tracker.peak.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_superseded_chain_skips_processing() {
        let h = harness(OrchestratorConfig::default());
        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();
        assert_eq!(h.processor.call_count(), EMOTION_COUNT);

        h.generator.set_delay(Duration::from_millis(100));
        let orchestrator = h.orchestrator.clone();
        let stale = tokio::spawn(async move { orchestrator.regenerate(5).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        h.orchestrator.generate_pack("tiger", "pixel").await.unwrap();
        let stale = stale.await.unwrap();

        assert!(matches!(stale, Err(OrchestratorError::Superseded(5))));
        assert_eq!(h.processor.call_count(), EMOTION_COUNT * 2);
    }

    #[tokio::test]
    async fn test_processing_flag_alternates_across_overlapping_calls() {
        let h = harness(OrchestratorConfig::default());
        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();
        h.processor.set_delay(Duration::from_millis(30));
        let mut rx = h.orchestrator.subscribe();

        let edits: Vec<_> = (1..=6)
            .map(|id| {
                let orchestrator = h.orchestrator.clone();
                tokio::spawn(async move { orchestrator.edit_caption(id, "嗨").await })
            })
            .collect();
        for edit in edits {
            edit.await.unwrap().unwrap();
        }
        assert!(!h.orchestrator.is_processing());

        let flags: Vec<bool> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                PackEvent::ProcessingChanged(flag) => Some(flag),
                _ => None,
            })
            .collect();
        assert!(!flags.is_empty());
        assert_eq!(flags.last(), Some(&false));
        for (idx, flag) in flags.iter().enumerate() {
            assert_eq!(*flag, idx % 2 == 0, "flags out of order: {:?}", flags);
        }
    }

    #[tokio::test]
    async fn test_cancelled_regenerate_releases_claim() {
        let h = harness(OrchestratorConfig::default());
        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();
        h.generator.set_delay(Duration::from_millis(500));

        let cancelled =
            tokio::time::timeout(Duration::from_millis(30), h.orchestrator.regenerate(5)).await;
        assert!(cancelled.is_err());
        assert!(!h.orchestrator.is_processing());

        h.generator.set_delay(Duration::ZERO);
        let record = h.orchestrator.regenerate(5).await.unwrap();
        assert_eq!(record.status, StickerStatus::Complete);
    }

    #[tokio::test]
    async fn test_cancelled_edit_releases_claim() {
        let h = harness(OrchestratorConfig::default());
        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();
        h.processor.set_delay(Duration::from_millis(200));

        let cancelled =
            tokio::time::timeout(Duration::from_millis(30), h.orchestrator.edit_caption(3, "好")).await;
        assert!(cancelled.is_err());

        h.processor.set_delay(Duration::ZERO);
        let record = h.orchestrator.edit_caption(3, "好嘞").await.unwrap();
        assert_eq!(record.status, StickerStatus::Complete);
        assert_eq!(record.caption, "好嘞");
    }

    #[tokio::test]
    async fn test_generation_timeout_marks_error() {
        let config = OrchestratorConfig::default()
            .with_timeouts(Duration::from_millis(20), Duration::from_secs(5));
        let h = harness(config);
        h.generator.set_delay(Duration::from_millis(500));

        let summary = h.orchestrator.generate_pack("panda", "chibi").await.unwrap();
        assert_eq!(summary.failed, EMOTION_COUNT);
        let record = h.orchestrator.record(1).await.unwrap();
        assert!(record.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_edit_caption_reprocesses_without_generation() {
        let h = harness(OrchestratorConfig::default());
        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();
        let generated = h.generator.call_count();

        let record = h.orchestrator.edit_caption(3, "好嘞").await.unwrap();
        assert_eq!(record.status, StickerStatus::Complete);
        assert_eq!(record.caption, "好嘞");
        assert_eq!(h.generator.call_count(), generated);

        let again = h.orchestrator.edit_caption(3, "好嘞").await.unwrap();
        assert_eq!(again.processed, record.processed);
    }

    #[tokio::test]
    async fn test_edit_caption_failure_keeps_caption() {
        let h = harness(OrchestratorConfig::default());
        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();
        h.processor.fail_on_caption("坏");

        let record = h.orchestrator.edit_caption(1, "坏").await.unwrap();
        assert_eq!(record.status, StickerStatus::Error);
        assert_eq!(record.caption, "坏");
        assert!(record.processed.is_none());
    }

    #[tokio::test]
    async fn test_edit_caption_requires_raw_image() {
        let h = harness(OrchestratorConfig::default());
        h.generator.fail_when_prompt_contains("waving hello");
        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();

        let result = h.orchestrator.edit_caption(1, "嗨").await;
        assert!(matches!(result, Err(OrchestratorError::MissingRawImage(1))));

        let result = h.orchestrator.edit_caption(99, "嗨").await;
        assert!(matches!(result, Err(OrchestratorError::StickerNotFound(99))));
    }

    #[tokio::test]
    async fn test_regenerate_recovers_failed_sticker() {
        let h = harness(OrchestratorConfig::default());
        h.generator.fail_when_prompt_contains("waving hello");
        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();
        assert_eq!(h.orchestrator.record(1).await.unwrap().status, StickerStatus::Error);

        h.generator.clear_failures();
        let record = h.orchestrator.regenerate(1).await.unwrap();
        assert_eq!(record.status, StickerStatus::Complete);
        assert_eq!(h.orchestrator.summary().await.complete, EMOTION_COUNT);
    }

    #[tokio::test]
    async fn test_regenerate_rejects_in_flight_sticker() {
        let h = harness(OrchestratorConfig::default());
        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();
        h.generator.set_delay(Duration::from_millis(200));

        let orchestrator = h.orchestrator.clone();
        let first = tokio::spawn(async move { orchestrator.regenerate(5).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = h.orchestrator.regenerate(5).await;
        assert!(matches!(second, Err(OrchestratorError::AlreadyInFlight(5))));
        let edit = h.orchestrator.edit_caption(5, "哈").await;
        assert!(matches!(edit, Err(OrchestratorError::AlreadyInFlight(5))));

        let first = first.await.unwrap().unwrap();
        assert_eq!(first.status, StickerStatus::Complete);
    }

    #[tokio::test]
    async fn test_events_are_ordered_per_sticker() {
        let h = harness(OrchestratorConfig::default());
        let mut rx = h.orchestrator.subscribe();
        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();
        let events = drain(&mut rx);

        assert!(matches!(events.first(), Some(PackEvent::ProcessingChanged(true))));
        assert!(matches!(events.last(), Some(PackEvent::ProcessingChanged(false))));
        assert!(events
            .iter()
            .any(|e| matches!(e, PackEvent::PackSeeded { ids, .. } if ids.len() == EMOTION_COUNT)));
        assert!(events.iter().any(|e| matches!(e, PackEvent::PackFinished(_))));

        let statuses: Vec<StickerStatus> = events
            .iter()
            .filter_map(|e| match e {
                PackEvent::StickerUpdated(update) if update.id == 7 => Some(update.status),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                StickerStatus::Generating,
                StickerStatus::Processing,
                StickerStatus::Complete
            ]
        );
    }

    #[tokio::test]
    async fn test_complete_update_carries_image() {
        let h = harness(OrchestratorConfig::default());
        let mut rx = h.orchestrator.subscribe();
        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();

        for event in drain(&mut rx) {
            if let PackEvent::StickerUpdated(update) = event {
                assert_eq!(update.image.is_some(), update.status == StickerStatus::Complete);
            }
        }
    }

    #[tokio::test]
    async fn test_new_pack_replaces_records() {
        let h = harness(OrchestratorConfig::default());
        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();
        let first = h.orchestrator.pack_id().await;

        h.orchestrator.generate_pack("tiger", "pixel art").await.unwrap();
        assert_ne!(h.orchestrator.pack_id().await, first);

        let records = h.orchestrator.records().await;
        assert_eq!(records.len(), EMOTION_COUNT);
        assert!(records.iter().all(|r| r.visual_prompt.contains("tiger")));
    }

    #[tokio::test]
    async fn test_export_emits_events() {
        let h = harness(OrchestratorConfig::default());
        let mut rx = h.orchestrator.subscribe();

        let empty = h.orchestrator.export().await;
        assert!(matches!(empty, Err(OrchestratorError::Export(_))));

        h.orchestrator.generate_pack("panda", "chibi").await.unwrap();
        let pack = h.orchestrator.export().await.unwrap();
        assert_eq!(pack.sticker_count, EMOTION_COUNT);

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(e, PackEvent::ExportFailed { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, PackEvent::ExportCompleted { sticker_count, .. } if *sticker_count == EMOTION_COUNT)));
    }
}
