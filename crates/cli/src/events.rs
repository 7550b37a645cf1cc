//! Progress logging from the orchestrator's event stream.

use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{debug, error, info, warn};

use stickerpack_core::{PackEvent, StickerStatus};

/// Log every event until the orchestrator is dropped.
pub async fn log_events(mut events: Receiver<PackEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => log_event(&event),
            Err(RecvError::Lagged(skipped)) => warn!("Progress log skipped {} events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}

fn log_event(event: &PackEvent) {
    match event {
        PackEvent::ProcessingChanged(active) => debug!(active, "Processing flag changed"),
        PackEvent::PackSeeded { pack_id, ids } => {
            info!(%pack_id, stickers = ids.len(), "Pack planned")
        }
        PackEvent::StickerUpdated(update) => match update.status {
            StickerStatus::Complete => {
                let bytes = update.image.as_ref().map(|s| s.image.len()).unwrap_or_default();
                info!(id = update.id, bytes, "Sticker complete")
            }
            StickerStatus::Error => warn!(
                id = update.id,
                error = update.error.as_deref().unwrap_or("unknown"),
                "Sticker failed"
            ),
            status => debug!(id = update.id, %status, "Sticker status"),
        },
        PackEvent::PackFinished(summary) => info!(
            complete = summary.complete,
            failed = summary.failed,
            "Pack finished"
        ),
        PackEvent::PackFailed { pack_id, error } => error!(%pack_id, "Pack failed: {}", error),
        PackEvent::ExportCompleted {
            sticker_count,
            bytes,
        } => info!(sticker_count, bytes, "Export complete"),
        PackEvent::ExportFailed { error } => error!("Export failed: {}", error),
    }
}
