//! Gallery persistence for committed artifacts.
//!
//! Metadata and raster bytes are stored separately; listing returns metadata
//! only.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use memory::MemoryGallery;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileGallery;

use crate::artifact::{ArtifactMetadata, ImageKind, WorkingImage};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Artifact not found: {0}")]
    NotFound(String),
    #[error("Invalid artifact id: {0}")]
    InvalidId(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Gallery persistence backend.
///
/// On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait Gallery: Send + Sync {
    /// Metadata of every stored artifact, newest batch first.
    fn list_artifacts(&self) -> BoxFuture<'_, StorageResult<Vec<ArtifactMetadata>>>;

    /// Persist a batch of images (metadata and bytes).
    fn save_artifacts<'a>(&'a self, images: &'a [WorkingImage]) -> BoxFuture<'a, StorageResult<()>>;

    /// Remove one artifact. Unknown ids are not an error.
    fn delete_artifact<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StorageResult<()>>;

    /// Remove every artifact.
    fn clear_all(&self) -> BoxFuture<'_, StorageResult<()>>;

    /// Metadata and bytes of one artifact.
    fn load_artifact<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StorageResult<WorkingImage>>;

    /// Metadata of the stored artifacts of one kind, in listing order.
    fn list_artifacts_by_kind(&self, kind: ImageKind) -> BoxFuture<'_, StorageResult<Vec<ArtifactMetadata>>> {
        Box::pin(async move {
            let mut artifacts = self.list_artifacts().await?;
            artifacts.retain(|artifact| artifact.kind == kind);
            Ok(artifacts)
        })
    }
}

/// Gallery persistence backend (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait Gallery {
    fn list_artifacts(&self) -> BoxFuture<'_, StorageResult<Vec<ArtifactMetadata>>>;

    fn save_artifacts<'a>(&'a self, images: &'a [WorkingImage]) -> BoxFuture<'a, StorageResult<()>>;

    fn delete_artifact<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StorageResult<()>>;

    fn clear_all(&self) -> BoxFuture<'_, StorageResult<()>>;

    fn load_artifact<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StorageResult<WorkingImage>>;

    fn list_artifacts_by_kind(&self, kind: ImageKind) -> BoxFuture<'_, StorageResult<Vec<ArtifactMetadata>>> {
        Box::pin(async move {
            let mut artifacts = self.list_artifacts().await?;
            artifacts.retain(|artifact| artifact.kind == kind);
            Ok(artifacts)
        })
    }
}
