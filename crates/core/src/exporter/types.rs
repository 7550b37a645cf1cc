//! Types for the exporter.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::emotion::Emotion;

/// Errors that can occur while exporting a pack.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No record is complete.
    #[error("nothing to export: no completed stickers")]
    Empty,

    /// Writing the archive failed.
    #[error("failed to write archive: {0}")]
    Archive(String),
}

impl From<zip::result::ZipError> for ExportError {
    fn from(err: zip::result::ZipError) -> Self {
        ExportError::Archive(err.to_string())
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Archive(err.to_string())
    }
}

/// A finished archive.
#[derive(Debug, Clone)]
pub struct ExportedPack {
    /// Zip archive bytes.
    pub bytes: Vec<u8>,
    /// Number of stickers in the archive.
    pub sticker_count: usize,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackManifest {
    pub sticker_count: usize,
    pub stickers: Vec<ManifestEntry>,
}

/// One sticker in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: u32,
    pub emotion: Emotion,
    pub caption: String,
    pub file: String,
    pub thumbnail: String,
    pub dimension: u32,
    pub bytes: usize,
    pub sha256: String,
}
