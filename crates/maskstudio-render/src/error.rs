//! Errors raised while decoding, compositing or encoding rasters.

use maskstudio_core::StudioError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("Display width must be positive, got {0}")]
    DegenerateScale(f64),
    #[error("No source image available")]
    MissingSourceImage,
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error("Cannot allocate a {width}x{height} raster")]
    Allocation { width: u32, height: u32 },
}

pub type CompositeResult<T> = Result<T, CompositeError>;

impl From<CompositeError> for StudioError {
    fn from(err: CompositeError) -> Self {
        match err {
            CompositeError::DegenerateScale(_) => StudioError::DegenerateScale,
            CompositeError::MissingSourceImage => StudioError::MissingSourceImage,
            other => StudioError::Codec(other.to_string()),
        }
    }
}
