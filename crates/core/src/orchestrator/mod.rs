//! Pack orchestrator for the sticker pipeline.
//!
//! The orchestrator owns the records of the active pack and drives them
//! through `pending -> generating -> processing -> complete | error`:
//! - **Planning**: one call per pack; failure leaves the pack empty
//! - **Batches**: `batch_size` stickers run concurrently, the next batch waits
//!   for the current one to settle
//! - **Edits / regenerations**: single sticker, rejected while that sticker
//!   already has a chain running
//!
//! Observers follow progress through [`PackEvent`]s from
//! [`PackOrchestrator::subscribe`].

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::PackOrchestrator;
pub use types::{
    OrchestratorError, PackEvent, PackSummary, StickerRecord, StickerStatus, StickerUpdate,
};
