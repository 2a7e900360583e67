//! Storage of ingested image files.
//!
//! Every image is copied into the data directory under a fresh v4 UUID, which
//! doubles as the entry's external id. The original file name is only used
//! to pick the extension.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::constants::{is_allowed_image_extension, FALLBACK_IMAGE_EXTENSION};
use crate::errors::{SnapError, SnapResult};

/// A file written by [`AssetStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub external_id: String,
    pub path: PathBuf,
}

/// Directory of ingested images.
#[derive(Debug, Clone)]
pub struct AssetStore {
    images_dir: PathBuf,
}

impl AssetStore {
    pub fn new(images_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
        }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Write `bytes` as `<images_dir>/<uuid>.<ext>`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::Validation`] for empty input and
    /// [`SnapError::Storage`] if the file cannot be written.
    pub fn save(&self, name_hint: &str, bytes: &[u8]) -> SnapResult<StoredAsset> {
        if bytes.is_empty() {
            return Err(SnapError::validation("image is empty"));
        }

        fs::create_dir_all(&self.images_dir)
            .map_err(|e| SnapError::storage(&self.images_dir, e.to_string()))?;

        let external_id = Uuid::new_v4().to_string();
        let path = self
            .images_dir
            .join(format!("{}.{}", external_id, normalized_extension(name_hint)));

        fs::write(&path, bytes).map_err(|e| SnapError::storage(&path, e.to_string()))?;
        debug!("Stored {} bytes at {:?}", bytes.len(), path);

        Ok(StoredAsset { external_id, path })
    }

    /// Delete a file written by [`AssetStore::save`]. Missing files are ignored.
    pub fn remove(&self, path: &Path) -> SnapResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SnapError::storage(path, e.to_string())),
        }
    }
}

/// Lowercase extension of `name` if it is an accepted image type, else `jpg`.
pub fn normalized_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| is_allowed_image_extension(e))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| FALLBACK_IMAGE_EXTENSION.to_string())
}
