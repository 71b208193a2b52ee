//! In-memory gallery.

use super::{BoxFuture, Gallery, StorageError, StorageResult};
use crate::artifact::{ArtifactMetadata, WorkingImage};
use std::sync::RwLock;

/// In-memory gallery for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryGallery {
    /// Newest batch first.
    artifacts: RwLock<Vec<WorkingImage>>,
}

impl MemoryGallery {
    /// Create a new empty gallery.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl Gallery for MemoryGallery {
    fn list_artifacts(&self) -> BoxFuture<'_, StorageResult<Vec<ArtifactMetadata>>> {
        Box::pin(async move {
            let artifacts = self.artifacts.read().map_err(lock_error)?;
            Ok(artifacts.iter().map(ArtifactMetadata::from).collect())
        })
    }

    fn save_artifacts<'a>(&'a self, images: &'a [WorkingImage]) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(async move {
            let mut artifacts = self.artifacts.write().map_err(lock_error)?;
            artifacts.retain(|stored| !images.iter().any(|image| image.id == stored.id));
            artifacts.splice(0..0, images.iter().cloned());
            Ok(())
        })
    }

    fn delete_artifact<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(async move {
            let mut artifacts = self.artifacts.write().map_err(lock_error)?;
            artifacts.retain(|stored| stored.id != id);
            Ok(())
        })
    }

    fn clear_all(&self) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            self.artifacts.write().map_err(lock_error)?.clear();
            Ok(())
        })
    }

    fn load_artifact<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StorageResult<WorkingImage>> {
        Box::pin(async move {
            let artifacts = self.artifacts.read().map_err(lock_error)?;
            artifacts
                .iter()
                .find(|stored| stored.id == id)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(id.to_string()))
        })
    }
}
