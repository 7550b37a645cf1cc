//! Exporter configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the pack archive layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Archive directory holding full-size stickers.
    #[serde(default = "default_sticker_dir")]
    pub sticker_dir: String,

    /// Archive directory holding thumbnails.
    #[serde(default = "default_thumbnail_dir")]
    pub thumbnail_dir: String,

    /// Write `manifest.json` at the archive root.
    #[serde(default = "default_include_manifest")]
    pub include_manifest: bool,
}

fn default_sticker_dir() -> String {
    "main".to_string()
}

fn default_thumbnail_dir() -> String {
    "thumb".to_string()
}

fn default_include_manifest() -> bool {
    true
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            sticker_dir: default_sticker_dir(),
            thumbnail_dir: default_thumbnail_dir(),
            include_manifest: default_include_manifest(),
        }
    }
}

impl ExportConfig {
    /// Checks that directory names are usable archive paths.
    pub fn validate(&self) -> Result<(), String> {
        for (field, dir) in [
            ("sticker_dir", &self.sticker_dir),
            ("thumbnail_dir", &self.thumbnail_dir),
        ] {
            if dir.is_empty() || dir.contains(['/', '\\']) || dir == "." || dir == ".." {
                return Err(format!("export.{} must be a single directory name, got {:?}", field, dir));
            }
        }
        if self.sticker_dir == self.thumbnail_dir {
            return Err("export.sticker_dir and export.thumbnail_dir must differ".to_string());
        }
        Ok(())
    }
}
