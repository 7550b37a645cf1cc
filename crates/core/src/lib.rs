pub mod config;
pub mod emotion;
pub mod exporter;
pub mod generator;
pub mod llm;
pub mod metrics;
pub mod orchestrator;
pub mod planner;
pub mod processor;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, resolve_config_path, validate_config, Config, ConfigError,
    SanitizedConfig,
};
pub use emotion::{Emotion, EMOTION_COUNT};
pub use exporter::{ExportError, ExportedPack, PackExporter};
pub use generator::{GenerationError, HttpImageGenerator, ImageGenerator};
pub use orchestrator::{
    OrchestratorError, PackEvent, PackOrchestrator, PackSummary, StickerRecord, StickerStatus,
};
pub use planner::{create_planner, Planner, PlanningError, StickerPlan};
pub use processor::{ImageProcessor, ProcessedSticker, ProcessingError, StickerProcessor};
