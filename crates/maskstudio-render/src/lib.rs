//! MaskStudio Render Library
//!
//! CPU rasterization for MaskStudio: flattening mask strokes onto the source
//! image at native resolution, drawing the live editing overlay and building
//! gallery thumbnails. Everything renders through tiny-skia.

mod compositor;
mod error;
mod raster;
mod renderer;
mod thumbnail;

pub use compositor::MaskCompositor;
pub use error::{CompositeError, CompositeResult};
pub use raster::{SourceImage, encode_png};
pub use renderer::{RenderContext, RenderResult, Renderer, RendererError, SkiaRenderer};
pub use thumbnail::{THUMBNAIL_MAX_SIDE, THUMBNAIL_QUALITY, thumbnail};
