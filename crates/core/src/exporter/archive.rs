//! Zip archive writer.

use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::config::ExportConfig;
use super::types::{ExportError, ExportedPack, ManifestEntry, PackManifest};
use crate::emotion::Emotion;
use crate::metrics;
use crate::orchestrator::StickerRecord;
use crate::processor::ProcessedSticker;

/// File name of one sticker inside its directory, e.g. `03_received.png`.
pub fn sticker_file_name(id: u32, emotion: Emotion) -> String {
    format!("{:02}_{}.png", id, emotion.key())
}

/// Builds pack archives from completed records.
#[derive(Debug, Clone, Default)]
pub struct PackExporter {
    config: ExportConfig,
}

impl PackExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Archive every complete record; anything else is skipped.
    ///
    /// Entries are written in id order with fixed timestamps, so the same
    /// records always produce the same archive bytes.
    pub fn export(&self, records: &[StickerRecord]) -> Result<ExportedPack, ExportError> {
        let mut complete: Vec<(&StickerRecord, &ProcessedSticker)> = records
            .iter()
            .filter(|r| r.is_complete())
            .filter_map(|r| r.processed.as_deref().map(|p| (r, p)))
            .collect();

        if complete.is_empty() {
            metrics::EXPORTS_TOTAL.with_label_values(&["failed"]).inc();
            warn!(records = records.len(), "Export requested with no completed stickers");
            return Err(ExportError::Empty);
        }
        complete.sort_by_key(|(record, _)| record.id);

        let skipped = records.len() - complete.len();
        let result = self.write_archive(&complete);
        match &result {
            Ok(pack) => {
                metrics::EXPORTS_TOTAL.with_label_values(&["success"]).inc();
                info!(
                    stickers = pack.sticker_count,
                    skipped,
                    bytes = pack.bytes.len(),
                    "Pack exported"
                );
            }
            Err(e) => {
                metrics::EXPORTS_TOTAL.with_label_values(&["failed"]).inc();
                warn!("Export failed: {}", e);
            }
        }
        result
    }

    fn write_archive(
        &self,
        stickers: &[(&StickerRecord, &ProcessedSticker)],
    ) -> Result<ExportedPack, ExportError> {
        let stored = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(DateTime::default());

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let mut entries = Vec::with_capacity(stickers.len());

        for (record, sticker) in stickers {
            let name = sticker_file_name(record.id, record.emotion);
            let file = format!("{}/{}", self.config.sticker_dir, name);
            let thumbnail = format!("{}/{}", self.config.thumbnail_dir, name);

            zip.start_file(file.as_str(), stored)?;
            zip.write_all(&sticker.image)?;
            zip.start_file(thumbnail.as_str(), stored)?;
            zip.write_all(&sticker.thumbnail)?;
            debug!(id = record.id, %file, bytes = sticker.image.len(), "Added sticker to archive");

            entries.push(ManifestEntry {
                id: record.id,
                emotion: record.emotion,
                caption: record.caption.clone(),
                file,
                thumbnail,
                dimension: sticker.dimension,
                bytes: sticker.image.len(),
                sha256: format!("{:x}", Sha256::digest(&sticker.image)),
            });
        }

        if self.config.include_manifest {
            let manifest = PackManifest {
                sticker_count: entries.len(),
                stickers: entries,
            };
            let json = serde_json::to_vec_pretty(&manifest)
                .map_err(|e| ExportError::Archive(format!("manifest: {}", e)))?;
            let deflated = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(DateTime::default());
            zip.start_file("manifest.json", deflated)?;
            zip.write_all(&json)?;
        }

        let bytes = zip.finish()?.into_inner();
        Ok(ExportedPack {
            bytes,
            sticker_count: stickers.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::StickerStatus;
    use crate::testing::fixtures;
    use std::io::Read;
    use zip::ZipArchive;

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    #[test]
    fn test_sticker_file_name() {
        assert_eq!(sticker_file_name(3, Emotion::Received), "03_received.png");
        assert_eq!(sticker_file_name(10, Emotion::GoodNight), "10_good_night.png");
    }

    #[test]
    fn test_export_only_complete_records() {
        let records = vec![
            fixtures::complete_record(1, Emotion::Greeting),
            fixtures::record_with_status(2, Emotion::Thanks, StickerStatus::Error),
            fixtures::complete_record(3, Emotion::Received),
            fixtures::record_with_status(4, Emotion::Farewell, StickerStatus::Generating),
        ];
        let pack = PackExporter::default().export(&records).unwrap();
        assert_eq!(pack.sticker_count, 2);

        let mut names = entry_names(&pack.bytes);
        names.sort();
        assert_eq!(
            names,
            vec![
                "main/01_greeting.png",
                "main/03_received.png",
                "manifest.json",
                "thumb/01_greeting.png",
                "thumb/03_received.png",
            ]
        );
    }

    #[test]
    fn test_export_entry_contents() {
        let record = fixtures::complete_record(5, Emotion::Confused);
        let expected = record.processed.clone().unwrap();
        let pack = PackExporter::default().export(&[record]).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(pack.bytes)).unwrap();
        let mut image = Vec::new();
        archive
            .by_name("main/05_confused.png")
            .unwrap()
            .read_to_end(&mut image)
            .unwrap();
        assert_eq!(image, expected.image);

        let mut manifest = String::new();
        archive
            .by_name("manifest.json")
            .unwrap()
            .read_to_string(&mut manifest)
            .unwrap();
        let manifest: PackManifest = serde_json::from_str(&manifest).unwrap();
        assert_eq!(manifest.sticker_count, 1);
        assert_eq!(manifest.stickers[0].caption, "疑惑");
        assert_eq!(
            manifest.stickers[0].sha256,
            format!("{:x}", Sha256::digest(&expected.image))
        );
    }

    #[test]
    fn test_export_without_manifest() {
        let exporter = PackExporter::new(ExportConfig {
            sticker_dir: "stickers".to_string(),
            thumbnail_dir: "icons".to_string(),
            include_manifest: false,
        });
        let pack = exporter
            .export(&[fixtures::complete_record(16, Emotion::Speechless)])
            .unwrap();
        let mut names = entry_names(&pack.bytes);
        names.sort();
        assert_eq!(names, vec!["icons/16_speechless.png", "stickers/16_speechless.png"]);
    }

    #[test]
    fn test_export_empty() {
        let records = vec![fixtures::record_with_status(1, Emotion::Greeting, StickerStatus::Pending)];
        assert!(matches!(
            PackExporter::default().export(&records),
            Err(ExportError::Empty)
        ));
        assert!(matches!(PackExporter::default().export(&[]), Err(ExportError::Empty)));
    }

    #[test]
    fn test_export_is_deterministic_and_ordered() {
        let forward = vec![
            fixtures::complete_record(1, Emotion::Greeting),
            fixtures::complete_record(2, Emotion::Thanks),
        ];
        let reversed: Vec<_> = forward.iter().rev().cloned().collect();

        let a = PackExporter::default().export(&forward).unwrap();
        let b = PackExporter::default().export(&reversed).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }
}
