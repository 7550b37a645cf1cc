//! Packs completed stickers into a distributable zip archive.
//!
//! Layout, with `NN` the zero-padded sticker id:
//!
//! ```text
//! main/NN_<emotion>.png     full-size sticker
//! thumb/NN_<emotion>.png    thumbnail
//! manifest.json             optional index with sha256 digests
//! ```

mod archive;
mod config;
mod types;

pub use archive::{sticker_file_name, PackExporter};
pub use config::ExportConfig;
pub use types::{ExportError, ExportedPack, ManifestEntry, PackManifest};
