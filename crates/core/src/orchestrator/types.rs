//! Types for the pack orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::emotion::Emotion;
use crate::planner::StickerPlan;
use crate::processor::ProcessedSticker;

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Planning failed; no records were created.
    #[error("planning failed: {0}")]
    Planning(#[from] crate::planner::PlanningError),

    /// No record with this id in the active pack.
    #[error("sticker not found: {0}")]
    StickerNotFound(u32),

    /// A generate/process chain is already running for this sticker.
    #[error("sticker {0} is already being generated or processed")]
    AlreadyInFlight(u32),

    /// The pack was replaced while this sticker's chain was running.
    #[error("sticker {0} belongs to a pack that was replaced")]
    Superseded(u32),

    /// Caption edits need an existing raw image.
    #[error("sticker {0} has no raw image to re-process")]
    MissingRawImage(u32),

    /// Export failed.
    #[error("export failed: {0}")]
    Export(#[from] crate::exporter::ExportError),
}

/// Lifecycle of one sticker record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StickerStatus {
    Pending,
    Generating,
    Processing,
    Complete,
    Error,
}

impl StickerStatus {
    /// `Complete` and `Error` end a chain.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StickerStatus::Complete | StickerStatus::Error)
    }
}

impl fmt::Display for StickerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StickerStatus::Pending => "pending",
            StickerStatus::Generating => "generating",
            StickerStatus::Processing => "processing",
            StickerStatus::Complete => "complete",
            StickerStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// The stateful unit tracking one sticker from plan to final image.
///
/// `processed` is set exactly when `status` is `Complete`. Image payloads are
/// shared so snapshots stay cheap.
#[derive(Debug, Clone)]
pub struct StickerRecord {
    pub id: u32,
    pub emotion: Emotion,
    pub visual_prompt: String,
    pub caption: String,
    pub status: StickerStatus,
    pub raw_image: Option<Arc<Vec<u8>>>,
    pub processed: Option<Arc<ProcessedSticker>>,
    /// Message of the most recent failure while `status` is `Error`.
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StickerRecord {
    /// Seed a `Pending` record from a plan.
    pub fn from_plan(plan: StickerPlan) -> Self {
        Self {
            id: plan.id,
            emotion: plan.emotion,
            visual_prompt: plan.visual_prompt,
            caption: plan.caption,
            status: StickerStatus::Pending,
            raw_image: None,
            processed: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// The plan fields, with any caption edit applied.
    pub fn plan(&self) -> StickerPlan {
        StickerPlan {
            id: self.id,
            emotion: self.emotion,
            visual_prompt: self.visual_prompt.clone(),
            caption: self.caption.clone(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == StickerStatus::Complete && self.processed.is_some()
    }
}

/// Per-record status notification.
#[derive(Debug, Clone)]
pub struct StickerUpdate {
    pub pack_id: Uuid,
    pub id: u32,
    pub status: StickerStatus,
    /// Finished sticker, present only for `Complete`.
    pub image: Option<Arc<ProcessedSticker>>,
    pub error: Option<String>,
}

/// Events emitted to the surrounding application.
#[derive(Debug, Clone)]
pub enum PackEvent {
    /// The pack-level "processing in progress" flag flipped.
    ProcessingChanged(bool),
    /// Records were seeded in `Pending`, ready for placeholders.
    PackSeeded { pack_id: Uuid, ids: Vec<u32> },
    /// One record changed status.
    StickerUpdated(StickerUpdate),
    /// Every batch of a pack settled.
    PackFinished(PackSummary),
    /// Planning failed; the pack is empty.
    PackFailed { pack_id: Uuid, error: String },
    /// An export finished.
    ExportCompleted { sticker_count: usize, bytes: usize },
    /// An export failed.
    ExportFailed { error: String },
}

/// Counts by status for the active pack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackSummary {
    pub pack_id: Option<Uuid>,
    pub total: usize,
    pub complete: usize,
    pub failed: usize,
    /// Records not yet terminal.
    pub pending: usize,
}

impl PackSummary {
    pub fn from_records(pack_id: Option<Uuid>, records: &[StickerRecord]) -> Self {
        let complete = records.iter().filter(|r| r.status == StickerStatus::Complete).count();
        let failed = records.iter().filter(|r| r.status == StickerStatus::Error).count();
        Self {
            pack_id,
            total: records.len(),
            complete,
            failed,
            pending: records.len() - complete - failed,
        }
    }
}
