//! Flattens a stroke log onto its source image at native resolution.

use crate::error::{CompositeError, CompositeResult};
use crate::raster::{SourceImage, encode_png, marker_paint, new_pixmap, paint_stroke};
use maskstudio_core::config::{ErasePolicy, MaskConfig};
use maskstudio_core::{MaskFlattener, StrokeLog, StudioResult};
use tiny_skia::{Pixmap, PixmapPaint, Transform};

/// Draws marker-colored strokes over a source image.
///
/// Strokes are recorded in content space against an image laid out
/// `display_width` units wide; they are rescaled by
/// `source width / display_width` so they land on the same pixels of the
/// native raster.
#[derive(Debug, Clone, Default)]
pub struct MaskCompositor {
    config: MaskConfig,
}

impl MaskCompositor {
    pub fn new(config: MaskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MaskConfig {
        &self.config
    }

    /// Display-to-native ratio.
    pub fn scale_factor(native_width: u32, display_width: f64) -> CompositeResult<f64> {
        if !(display_width.is_finite() && display_width > 0.0) {
            return Err(CompositeError::DegenerateScale(display_width));
        }
        Ok(native_width as f64 / display_width)
    }

    /// Composite into a new raster the size of `source`.
    pub fn composite(&self, source: &SourceImage, display_width: f64, strokes: &StrokeLog) -> CompositeResult<Pixmap> {
        let scale = Self::scale_factor(source.width(), display_width)?;
        let mut output = new_pixmap(source.width(), source.height())?;
        output.draw_pixmap(
            0,
            0,
            source.pixmap().as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );

        match self.config.erase_policy {
            ErasePolicy::MarkAsEdit => {
                let paint = marker_paint(self.config.marker, self.config.marker_opacity);
                for stroke in strokes.iter() {
                    paint_stroke(&mut output, &stroke.scaled(scale), &paint, Transform::identity(), false);
                }
            }
            ErasePolicy::Subtract => {
                // Strokes go on their own layer so erasing never touches the source
                let mut layer = new_pixmap(source.width(), source.height())?;
                let paint = marker_paint(self.config.marker, 1.0);
                for stroke in strokes.iter() {
                    paint_stroke(&mut layer, &stroke.scaled(scale), &paint, Transform::identity(), true);
                }
                let layer_paint = PixmapPaint {
                    opacity: self.config.marker_opacity,
                    ..PixmapPaint::default()
                };
                output.draw_pixmap(0, 0, layer.as_ref(), &layer_paint, Transform::identity(), None);
            }
        }

        log::debug!(
            "Composited {} stroke(s) onto {}x{} at scale {:.3}",
            strokes.len(),
            source.width(),
            source.height(),
            scale
        );
        Ok(output)
    }

    /// Decode, composite and encode as PNG.
    pub fn flatten_bytes(&self, source: &[u8], display_width: f64, strokes: &StrokeLog) -> CompositeResult<Vec<u8>> {
        // Check the scale before paying for a decode
        if !(display_width.is_finite() && display_width > 0.0) {
            return Err(CompositeError::DegenerateScale(display_width));
        }
        let source = SourceImage::decode(source)?;
        let output = self.composite(&source, display_width, strokes)?;
        encode_png(&output)
    }
}

impl MaskFlattener for MaskCompositor {
    fn flatten(&self, source: &[u8], display_width: f64, strokes: &StrokeLog) -> StudioResult<Vec<u8>> {
        Ok(self.flatten_bytes(source, display_width, strokes)?)
    }
}
