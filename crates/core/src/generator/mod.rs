//! Generator: turns one visual prompt into one raw image.
//!
//! Single attempt per call, no internal retry; retrying is the
//! orchestrator's `regenerate`. Payloads are validated at the boundary so
//! nothing undecodable reaches the processor.

mod config;
mod http;
mod traits;

pub use config::GeneratorConfig;
pub use http::HttpImageGenerator;
pub use traits::{validate_payload, GenerationError, ImageGenerator};
