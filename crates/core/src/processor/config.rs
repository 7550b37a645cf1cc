//! Configuration for the sticker processor.
//!
//! Pixel quantities in [`ProcessorConfig`] and [`CaptionConfig`] are
//! expressed at `working_size`, the square canvas every raw image is fitted
//! onto before compositing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// An opaque sRGB colour, written as `#RRGGBB` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor(pub [u8; 3]);

impl RgbColor {
    pub const WHITE: RgbColor = RgbColor([255, 255, 255]);
    pub const BLACK: RgbColor = RgbColor([0, 0, 0]);
}

impl TryFrom<String> for RgbColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let hex = value
            .strip_prefix('#')
            .ok_or_else(|| format!("colour must start with '#': {}", value))?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("colour must be #RRGGBB: {}", value));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        Ok(RgbColor([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl From<RgbColor> for String {
    fn from(color: RgbColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{:02X}{:02X}{:02X}", r, g, b)
    }
}

/// Configuration for the processing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Edge length of the exported sticker.
    #[serde(default = "default_sticker_size")]
    pub sticker_size: u32,

    /// Edge length of the exported thumbnail.
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,

    /// Maximum encoded size of one image, in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Edge length of the compositing canvas.
    #[serde(default = "default_working_size")]
    pub working_size: u32,

    /// Colour distance from the background below which a pixel is fully transparent.
    #[serde(default = "default_inner_tolerance")]
    pub background_inner_tolerance: f32,

    /// Colour distance above which a pixel is fully opaque. Pixels in between
    /// get a proportional alpha.
    #[serde(default = "default_outer_tolerance")]
    pub background_outer_tolerance: f32,

    /// Outline width around the subject.
    #[serde(default = "default_stroke_width")]
    pub stroke_width: u32,

    /// Outline colour.
    #[serde(default = "default_stroke_color")]
    pub stroke_color: RgbColor,

    /// Fewest colour levels per channel the size-budget search may posterize to.
    #[serde(default = "default_min_quality_levels")]
    pub min_quality_levels: u16,

    /// Smallest edge length the size-budget search may shrink to.
    /// Equal to `sticker_size` means the dimension is never reduced.
    #[serde(default = "default_min_dimension")]
    pub min_dimension: u32,

    /// Caption overlay settings.
    #[serde(default)]
    pub caption: CaptionConfig,
}

/// Caption overlay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionConfig {
    /// TrueType/OpenType font with glyphs for every caption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,

    /// Font size as a fraction of the canvas edge.
    #[serde(default = "default_caption_size_ratio")]
    pub size_ratio: f32,

    /// Widest the caption may be, as a fraction of the canvas edge.
    #[serde(default = "default_caption_max_width_ratio")]
    pub max_width_ratio: f32,

    /// Distance from the bottom edge, as a fraction of the canvas edge.
    #[serde(default = "default_caption_bottom_margin_ratio")]
    pub bottom_margin_ratio: f32,

    /// Glyph fill colour.
    #[serde(default = "default_caption_fill")]
    pub fill_color: RgbColor,

    /// Glyph outline colour.
    #[serde(default = "default_caption_outline")]
    pub outline_color: RgbColor,

    /// Glyph outline width.
    #[serde(default = "default_caption_outline_width")]
    pub outline_width: u32,
}

fn default_sticker_size() -> u32 {
    240
}

fn default_thumbnail_size() -> u32 {
    120
}

fn default_max_bytes() -> usize {
    100 * 1024
}

fn default_working_size() -> u32 {
    480
}

fn default_inner_tolerance() -> f32 {
    24.0
}

fn default_outer_tolerance() -> f32 {
    72.0
}

fn default_stroke_width() -> u32 {
    8
}

fn default_stroke_color() -> RgbColor {
    RgbColor::WHITE
}

fn default_min_quality_levels() -> u16 {
    8
}

fn default_min_dimension() -> u32 {
    default_sticker_size()
}

fn default_caption_size_ratio() -> f32 {
    0.16
}

fn default_caption_max_width_ratio() -> f32 {
    0.92
}

fn default_caption_bottom_margin_ratio() -> f32 {
    0.04
}

fn default_caption_fill() -> RgbColor {
    RgbColor::BLACK
}

fn default_caption_outline() -> RgbColor {
    RgbColor::WHITE
}

fn default_caption_outline_width() -> u32 {
    5
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            size_ratio: default_caption_size_ratio(),
            max_width_ratio: default_caption_max_width_ratio(),
            bottom_margin_ratio: default_caption_bottom_margin_ratio(),
            fill_color: default_caption_fill(),
            outline_color: default_caption_outline(),
            outline_width: default_caption_outline_width(),
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            sticker_size: default_sticker_size(),
            thumbnail_size: default_thumbnail_size(),
            max_bytes: default_max_bytes(),
            working_size: default_working_size(),
            background_inner_tolerance: default_inner_tolerance(),
            background_outer_tolerance: default_outer_tolerance(),
            stroke_width: default_stroke_width(),
            stroke_color: default_stroke_color(),
            min_quality_levels: default_min_quality_levels(),
            min_dimension: default_min_dimension(),
            caption: CaptionConfig::default(),
        }
    }
}

impl ProcessorConfig {
    /// Sets the exported sticker and thumbnail sizes.
    pub fn with_sizes(mut self, sticker: u32, thumbnail: u32) -> Self {
        self.sticker_size = sticker;
        self.thumbnail_size = thumbnail;
        self.min_dimension = self.min_dimension.min(sticker);
        self
    }

    /// Sets the byte budget.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Sets the compositing canvas size.
    pub fn with_working_size(mut self, working_size: u32) -> Self {
        self.working_size = working_size;
        self
    }

    /// Sets the outline stroke.
    pub fn with_stroke(mut self, width: u32, color: RgbColor) -> Self {
        self.stroke_width = width;
        self.stroke_color = color;
        self
    }

    /// Sets the smallest dimension the size-budget search may fall back to.
    pub fn with_min_dimension(mut self, min_dimension: u32) -> Self {
        self.min_dimension = min_dimension;
        self
    }

    /// Checks internal consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.sticker_size == 0 || self.thumbnail_size == 0 {
            return Err("sticker_size and thumbnail_size must be positive".to_string());
        }
        if self.thumbnail_size >= self.sticker_size {
            return Err(format!(
                "thumbnail_size ({}) must be smaller than sticker_size ({})",
                self.thumbnail_size, self.sticker_size
            ));
        }
        if self.working_size < self.sticker_size {
            return Err(format!(
                "working_size ({}) must be at least sticker_size ({})",
                self.working_size, self.sticker_size
            ));
        }
        if self.max_bytes == 0 {
            return Err("max_bytes must be positive".to_string());
        }
        if self.min_dimension == 0 || self.min_dimension > self.sticker_size {
            return Err(format!(
                "min_dimension must be between 1 and sticker_size, got {}",
                self.min_dimension
            ));
        }
        if !(2..=256).contains(&self.min_quality_levels) {
            return Err(format!(
                "min_quality_levels must be between 2 and 256, got {}",
                self.min_quality_levels
            ));
        }
        if self.background_inner_tolerance < 0.0
            || self.background_outer_tolerance <= self.background_inner_tolerance
        {
            return Err("background tolerances must satisfy 0 <= inner < outer".to_string());
        }
        if self.stroke_width * 4 >= self.working_size {
            return Err(format!(
                "stroke_width ({}) is too large for working_size ({})",
                self.stroke_width, self.working_size
            ));
        }
        let caption = &self.caption;
        if !(0.0..=1.0).contains(&caption.size_ratio) || caption.size_ratio == 0.0 {
            return Err("caption.size_ratio must be in (0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&caption.max_width_ratio) || caption.max_width_ratio == 0.0 {
            return Err("caption.max_width_ratio must be in (0, 1]".to_string());
        }
        if !(0.0..0.5).contains(&caption.bottom_margin_ratio) {
            return Err("caption.bottom_margin_ratio must be in [0, 0.5)".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProcessorConfig::default();
        assert_eq!(config.sticker_size, 240);
        assert_eq!(config.thumbnail_size, 120);
        assert_eq!(config.max_bytes, 102_400);
        assert_eq!(config.min_dimension, 240);
        assert_eq!(config.stroke_color, RgbColor::WHITE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!(
            RgbColor::try_from("#FF8000".to_string()).unwrap(),
            RgbColor([255, 128, 0])
        );
        assert_eq!(
            RgbColor::try_from("#ff8000".to_string()).unwrap(),
            RgbColor([255, 128, 0])
        );
        assert!(RgbColor::try_from("FF8000".to_string()).is_err());
        assert!(RgbColor::try_from("#FF80".to_string()).is_err());
        assert!(RgbColor::try_from("#GG8000".to_string()).is_err());
        assert_eq!(RgbColor([1, 2, 255]).to_string(), "#0102FF");
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r##"
            stroke_width = 12
            stroke_color = "#FFCC00"

            [caption]
            font_path = "/fonts/NotoSansSC-Bold.otf"
            fill_color = "#202020"
        "##;
        let config: ProcessorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.stroke_width, 12);
        assert_eq!(config.stroke_color, RgbColor([255, 204, 0]));
        assert_eq!(config.caption.fill_color, RgbColor([32, 32, 32]));
        assert_eq!(config.caption.outline_color, RgbColor::WHITE);
        assert_eq!(config.sticker_size, 240);
    }

    #[test]
    fn test_deserialize_bad_color() {
        let toml = r#"stroke_color = "white""#;
        assert!(toml::from_str::<ProcessorConfig>(toml).is_err());
    }

    #[test]
    fn test_builder_and_validation() {
        let config = ProcessorConfig::default()
            .with_sizes(96, 48)
            .with_working_size(128)
            .with_stroke(3, RgbColor::BLACK)
            .with_max_bytes(4096);
        assert_eq!(config.min_dimension, 96);
        assert!(config.validate().is_ok());

        assert!(ProcessorConfig::default().with_sizes(120, 120).validate().is_err());
        assert!(ProcessorConfig::default().with_max_bytes(0).validate().is_err());
        assert!(ProcessorConfig::default().with_working_size(200).validate().is_err());
        assert!(ProcessorConfig::default().with_min_dimension(300).validate().is_err());
    }
}
