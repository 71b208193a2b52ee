//! MaskStudio Core Library
//!
//! Platform-agnostic editing state for the MaskStudio image studio: viewport,
//! freehand mask strokes with undo/redo, the session of working images and
//! the contracts with the gallery and generation collaborators.

pub mod artifact;
pub mod config;
pub mod editor;
pub mod error;
pub mod gallery;
pub mod generation;
pub mod history;
pub mod input;
pub mod recorder;
pub mod session;
pub mod stroke;
pub mod studio;
pub mod viewport;

pub use artifact::{
    ArtifactMetadata, AspectRatio, GenerationConfig, ImageFormat, ImageKind, ResolutionTier, UploadError,
    UploadPolicy, WorkingImage, export_file_name,
};
pub use config::{ErasePolicy, MaskConfig, StudioConfig};
pub use editor::{BrushCursor, EditorContext, InteractionMode};
pub use error::{RemoteFailure, StudioError, StudioResult};
pub use gallery::{Gallery, MemoryGallery, StorageError};
pub use generation::{
    ContinuationToken, GenerationClient, GenerationError, Turn, UpscaleClient, UpscaleFactor, UpscaleModel,
    UpscaleRequest,
};
pub use history::History;
pub use input::{Modifiers, MouseButton, PointerEvent};
pub use recorder::{StrokeRecorder, ToolKind};
pub use session::Session;
pub use stroke::{Stroke, StrokeLog, StrokeTool};
pub use studio::{MaskFlattener, Studio, Submission, SubmissionKey, UpscaleSubmission};
pub use viewport::Viewport;

#[cfg(not(target_arch = "wasm32"))]
pub use gallery::FileGallery;
