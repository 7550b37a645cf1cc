//! Prometheus metrics for the pack pipeline.
//!
//! This module provides metrics for:
//! - Orchestrator (packs, sticker outcomes, in-flight chains)
//! - Stages (planning, generation, processing, export)
//! - External services (LLM token usage)

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Registry holding every metric in this module.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        registry.register(metric).unwrap();
    }
    registry
});

// =============================================================================
// Orchestrator Metrics
// =============================================================================

/// Pack runs total by result.
pub static PACKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stickerpack_packs_total", "Total pack generation runs"),
        &["result"], // "completed", "failed"
    )
    .unwrap()
});

/// Stickers reaching a terminal state, by result.
pub static STICKER_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "stickerpack_sticker_outcomes_total",
            "Stickers reaching a terminal state",
        ),
        &["operation", "result"], // operation: "generate", "regenerate", "edit"; result: "complete", "error"
    )
    .unwrap()
});

/// Sticker chains currently running.
pub static STICKERS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "stickerpack_stickers_in_flight",
        "Sticker generate/process chains currently running",
    )
    .unwrap()
});

// =============================================================================
// Stage Metrics
// =============================================================================

/// Planning duration in seconds.
pub static PLANNING_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("stickerpack_planning_duration_seconds", "Duration of pack planning")
            .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["planner", "result"],
    )
    .unwrap()
});

/// Image generation duration in seconds.
pub static GENERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "stickerpack_generation_duration_seconds",
            "Duration of image generation requests",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Processing duration in seconds.
pub static PROCESSING_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "stickerpack_processing_duration_seconds",
            "Duration of the raw-to-sticker pipeline",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Size budget fallbacks by kind.
pub static BUDGET_FALLBACKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "stickerpack_budget_fallbacks_total",
            "Encodings that needed a lossy fallback to fit the byte budget",
        ),
        &["kind"], // "levels", "dimension"
    )
    .unwrap()
});

/// Exports total by result.
pub static EXPORTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stickerpack_exports_total", "Total pack exports"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// LLM tokens used.
pub static LLM_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stickerpack_llm_tokens_total", "Total LLM tokens used"),
        &["provider", "direction"], // direction: "input", "output"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Orchestrator
        Box::new(PACKS_TOTAL.clone()),
        Box::new(STICKER_OUTCOMES.clone()),
        Box::new(STICKERS_IN_FLIGHT.clone()),
        // Stages
        Box::new(PLANNING_DURATION.clone()),
        Box::new(GENERATION_DURATION.clone()),
        Box::new(PROCESSING_DURATION.clone()),
        Box::new(BUDGET_FALLBACKS.clone()),
        Box::new(EXPORTS_TOTAL.clone()),
        // External services
        Box::new(LLM_TOKENS.clone()),
    ]
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        PACKS_TOTAL.with_label_values(&["completed"]).inc();

        let output = encode_metrics();
        assert!(output.contains("stickerpack_packs_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_stage_metrics() {
        // Vec metrics only show up once a label set has been touched
        PLANNING_DURATION
            .with_label_values(&["template", "success"])
            .observe(0.01);
        GENERATION_DURATION.with_label_values(&["success"]).observe(1.0);
        PROCESSING_DURATION.with_label_values(&["success"]).observe(0.2);
        BUDGET_FALLBACKS.with_label_values(&["levels"]).inc();
        EXPORTS_TOTAL.with_label_values(&["success"]).inc();
        STICKERS_IN_FLIGHT.set(0);

        let output = encode_metrics();
        assert!(output.contains("stickerpack_planning_duration_seconds"));
        assert!(output.contains("stickerpack_generation_duration_seconds"));
        assert!(output.contains("stickerpack_processing_duration_seconds"));
        assert!(output.contains("stickerpack_budget_fallbacks_total"));
        assert!(output.contains("stickerpack_exports_total"));
        assert!(output.contains("stickerpack_stickers_in_flight"));
    }
}
