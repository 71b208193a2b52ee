//! File-based gallery for native platforms.

use super::{BoxFuture, Gallery, StorageError, StorageResult};
use crate::artifact::{ArtifactMetadata, ImageFormat, WorkingImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const METADATA_FILE: &str = "metadata.json";

/// Flat-file gallery.
///
/// Layout: `<base>/metadata.json` holds a JSON array of [`ArtifactMetadata`],
/// newest batch first; each artifact's bytes live in `<base>/<id>.<ext>`, the
/// extension following the sniffed format (PNG when unrecognized). Ids must
/// be hyphenated lowercase UUIDs.
///
/// The synchronous methods are usable directly from blocking contexts; the
/// [`Gallery`] impl wraps them.
pub struct FileGallery {
    base_path: PathBuf,
    /// Serializes read-modify-write cycles on the metadata file.
    write_lock: Mutex<()>,
}

impl FileGallery {
    /// Create a gallery rooted at `base_path`, creating the directory if
    /// needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create gallery directory: {}", e))
            })?;
        }
        Ok(Self {
            base_path,
            write_lock: Mutex::new(()),
        })
    }

    /// Gallery in the default location.
    ///
    /// On Unix: `~/.local/share/maskstudio/gallery/`
    /// On Windows: `%LOCALAPPDATA%\maskstudio\gallery\`
    pub fn default_location() -> StorageResult<Self> {
        Self::new(Self::default_path()?)
    }

    pub fn default_path() -> StorageResult<PathBuf> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Ok(base.join("maskstudio").join("gallery"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn metadata_path(&self) -> PathBuf {
        self.base_path.join(METADATA_FILE)
    }

    /// Path of the raster file for `id` stored as `format`.
    pub fn artifact_path(&self, id: &str, format: ImageFormat) -> StorageResult<PathBuf> {
        let id = checked_id(id)?;
        Ok(self.base_path.join(format!("{}.{}", id, format.extension())))
    }

    /// The raster file stored for `id`, whatever its format.
    pub fn find_artifact_file(&self, id: &str) -> StorageResult<Option<PathBuf>> {
        for format in ImageFormat::ALL {
            let path = self.artifact_path(id, format)?;
            if path.exists() {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Delete the raster files of `id` in every format except `keep`.
    fn remove_files(&self, id: &str, keep: Option<ImageFormat>) -> StorageResult<()> {
        for format in ImageFormat::ALL {
            if Some(format) == keep {
                continue;
            }
            let path = self.artifact_path(id, format)?;
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
                })?;
            }
        }
        Ok(())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))
    }

    /// All metadata. A missing metadata file reads as an empty gallery.
    pub fn read_metadata(&self) -> StorageResult<Vec<ArtifactMetadata>> {
        let path = self.metadata_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&path).map_err(|e| {
            StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn write_metadata(&self, metadata: &[ArtifactMetadata]) -> StorageResult<()> {
        let path = self.metadata_path();
        let json = serde_json::to_string_pretty(metadata)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(&path, json).map_err(|e| {
            StorageError::Io(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    /// Write each image's bytes, then prepend the batch to the metadata.
    pub fn write_artifacts(&self, images: &[WorkingImage]) -> StorageResult<()> {
        for image in images {
            checked_id(&image.id)?;
        }
        let _guard = self.lock()?;

        for image in images {
            let format = ImageFormat::from_magic_bytes(&image.data).unwrap_or(ImageFormat::Png);
            let path = self.artifact_path(&image.id, format)?;
            fs::write(&path, &image.data).map_err(|e| {
                StorageError::Io(format!("Failed to write {}: {}", path.display(), e))
            })?;
            // A re-save may change the format
            self.remove_files(&image.id, Some(format))?;
        }

        let mut metadata: Vec<ArtifactMetadata> = images.iter().map(ArtifactMetadata::from).collect();
        let existing = self.read_metadata()?;
        metadata.extend(
            existing
                .into_iter()
                .filter(|stored| !images.iter().any(|image| image.id == stored.id)),
        );
        self.write_metadata(&metadata)?;

        log::info!("Saved {} artifact(s) to {}", images.len(), self.base_path.display());
        Ok(())
    }

    /// Remove one artifact's file and metadata row.
    pub fn remove_artifact(&self, id: &str) -> StorageResult<()> {
        checked_id(id)?;
        let _guard = self.lock()?;

        self.remove_files(id, None)?;

        let mut metadata = self.read_metadata()?;
        let before = metadata.len();
        metadata.retain(|stored| stored.id != id);
        if metadata.len() != before {
            self.write_metadata(&metadata)?;
        }
        Ok(())
    }

    /// Remove every listed artifact file and empty the metadata.
    pub fn remove_all(&self) -> StorageResult<()> {
        let _guard = self.lock()?;

        for stored in self.read_metadata()? {
            if let Err(e) = self.remove_files(&stored.id, None) {
                log::warn!("Failed to delete files of {}: {}", stored.id, e);
            }
        }
        self.write_metadata(&[])
    }

    /// Raster bytes of one artifact.
    pub fn read_image(&self, id: &str) -> StorageResult<Vec<u8>> {
        let path = self
            .find_artifact_file(id)?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        fs::read(&path).map_err(|e| {
            StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
        })
    }

    /// Metadata and bytes of one artifact.
    pub fn read_artifact(&self, id: &str) -> StorageResult<WorkingImage> {
        checked_id(id)?;
        let metadata = self
            .read_metadata()?
            .into_iter()
            .find(|stored| stored.id == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        let data = self.read_image(id)?;
        Ok(WorkingImage::from_parts(metadata, data))
    }
}

/// Only canonical UUIDs name files, so distinct ids never share one.
fn checked_id(id: &str) -> StorageResult<&str> {
    match Uuid::parse_str(id) {
        Ok(uuid) if uuid.hyphenated().to_string() == id => Ok(id),
        _ => Err(StorageError::InvalidId(id.to_string())),
    }
}

impl Gallery for FileGallery {
    fn list_artifacts(&self) -> BoxFuture<'_, StorageResult<Vec<ArtifactMetadata>>> {
        Box::pin(async move { self.read_metadata() })
    }

    fn save_artifacts<'a>(&'a self, images: &'a [WorkingImage]) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(async move { self.write_artifacts(images) })
    }

    fn delete_artifact<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(async move { self.remove_artifact(id) })
    }

    fn clear_all(&self) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move { self.remove_all() })
    }

    fn load_artifact<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StorageResult<WorkingImage>> {
        Box::pin(async move { self.read_artifact(id) })
    }
}
