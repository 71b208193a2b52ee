//! Error taxonomy shared by the editing core.

use crate::artifact::UploadError;
use crate::generation::GenerationError;
use crate::gallery::StorageError;
use thiserror::Error;

/// Failure reported by one of the remote collaborators.
///
/// The original cause is kept intact so callers can present it verbatim.
#[derive(Debug, Error)]
pub enum RemoteFailure {
    #[error("gallery: {0}")]
    Gallery(#[from] StorageError),
    #[error("generation: {0}")]
    Generation(#[from] GenerationError),
}

/// Errors produced by the editing core.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },
    #[error("Display width must be positive to derive a scale factor")]
    DegenerateScale,
    #[error("No source image available")]
    MissingSourceImage,
    #[error("A submission is already in flight for {0}")]
    OperationInProgress(String),
    #[error("Remote failure: {0}")]
    RemoteFailure(#[from] RemoteFailure),
    #[error("Upload rejected: {0}")]
    Upload(#[from] UploadError),
    #[error("Codec error: {0}")]
    Codec(String),
}

impl From<StorageError> for StudioError {
    fn from(err: StorageError) -> Self {
        StudioError::RemoteFailure(RemoteFailure::Gallery(err))
    }
}

impl From<GenerationError> for StudioError {
    fn from(err: GenerationError) -> Self {
        StudioError::RemoteFailure(RemoteFailure::Generation(err))
    }
}

/// Result type for core operations.
pub type StudioResult<T> = Result<T, StudioError>;
