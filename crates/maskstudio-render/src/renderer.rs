//! Renderer trait abstraction and the CPU overlay renderer.

use crate::raster::{SourceImage, marker_paint, new_pixmap, paint_stroke, to_transform};
use kurbo::{Affine, Size};
use maskstudio_core::config::MaskConfig;
use maskstudio_core::{BrushCursor, EditorContext, StrokeLog, Viewport};
use peniko::Color;
use thiserror::Error;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Transform};

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    pub viewport: &'a Viewport,
    /// Viewport size in pixels.
    pub viewport_size: Size,
    /// Decoded active image.
    pub image: Option<&'a SourceImage>,
    /// Size the image is laid out at in content space.
    pub display_size: Option<Size>,
    /// Committed strokes plus the open one.
    pub strokes: StrokeLog,
    pub brush_cursor: Option<BrushCursor>,
    pub background_color: Color,
    pub mask: MaskConfig,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(viewport: &'a Viewport, viewport_size: Size) -> Self {
        Self {
            viewport,
            viewport_size,
            image: None,
            display_size: None,
            strokes: StrokeLog::new(),
            brush_cursor: None,
            background_color: Color::from_rgba8(24, 24, 27, 255),
            mask: MaskConfig::default(),
        }
    }

    /// Everything the editor knows about the current frame.
    pub fn from_editor(editor: &'a EditorContext, image: Option<&'a SourceImage>, mask: MaskConfig) -> Self {
        Self {
            image,
            display_size: editor.image_size(),
            strokes: editor.preview_strokes(),
            brush_cursor: editor.brush_cursor(),
            mask,
            ..Self::new(editor.viewport(), editor.viewport_size())
        }
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_image(mut self, image: &'a SourceImage, display_size: Size) -> Self {
        self.image = Some(image);
        self.display_size = Some(display_size);
        self
    }

    pub fn with_strokes(mut self, strokes: StrokeLog) -> Self {
        self.strokes = strokes;
        self
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Draw one frame.
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}

/// Software renderer for the editing surface.
///
/// Draws the image under the viewport transform, the strokes on a separate
/// layer composited at the overlay opacity (Erase strokes cut that layer)
/// and the brush outline.
#[derive(Default)]
pub struct SkiaRenderer {
    frame: Option<Pixmap>,
}

impl SkiaRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last rendered frame.
    pub fn frame(&self) -> Option<&Pixmap> {
        self.frame.as_ref()
    }

    /// Reuse the frame buffer when the size is unchanged.
    fn take_frame(&mut self, width: u32, height: u32) -> RenderResult<Pixmap> {
        match self.frame.take() {
            Some(frame) if frame.width() == width && frame.height() == height => Ok(frame),
            _ => new_pixmap(width, height).map_err(|e| RendererError::Surface(e.to_string())),
        }
    }

    fn draw_image(frame: &mut Pixmap, ctx: &RenderContext, image: &SourceImage) {
        let display = ctx.display_size.unwrap_or_else(|| image.size());
        let fit = Affine::scale_non_uniform(
            display.width / image.width() as f64,
            display.height / image.height() as f64,
        );
        let paint = PixmapPaint {
            quality: tiny_skia::FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        frame.draw_pixmap(
            0,
            0,
            image.pixmap().as_ref(),
            &paint,
            to_transform(ctx.viewport.transform() * fit),
            None,
        );
    }

    fn draw_strokes(frame: &mut Pixmap, ctx: &RenderContext) -> RenderResult<()> {
        if ctx.strokes.is_empty() {
            return Ok(());
        }

        let mut layer =
            new_pixmap(frame.width(), frame.height()).map_err(|e| RendererError::Surface(e.to_string()))?;
        let paint = marker_paint(ctx.mask.marker, 1.0);
        let transform = to_transform(ctx.viewport.transform());
        for stroke in ctx.strokes.iter() {
            paint_stroke(&mut layer, stroke, &paint, transform, true);
        }

        let layer_paint = PixmapPaint {
            opacity: ctx.mask.overlay_opacity,
            ..PixmapPaint::default()
        };
        frame.draw_pixmap(0, 0, layer.as_ref(), &layer_paint, Transform::identity(), None);
        Ok(())
    }

    fn draw_cursor(frame: &mut Pixmap, cursor: BrushCursor) {
        let radius = (cursor.diameter / 2.0) as f32;
        let Some(circle) = PathBuilder::from_circle(cursor.center.x as f32, cursor.center.y as f32, radius) else {
            return;
        };

        let outline = tiny_skia::Stroke {
            width: 1.5,
            ..Default::default()
        };
        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color_rgba8(255, 255, 255, 230);
        frame.stroke_path(&circle, &paint, &outline, Transform::identity(), None);

        paint.set_color_rgba8(255, 0, 0, 40);
        frame.fill_path(&circle, &paint, FillRule::Winding, Transform::identity(), None);
    }
}

impl Renderer for SkiaRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        let width = ctx.viewport_size.width.ceil() as u32;
        let height = ctx.viewport_size.height.ceil() as u32;
        if width == 0 || height == 0 {
            return Err(RendererError::Surface(format!(
                "viewport has no area ({}x{})",
                ctx.viewport_size.width, ctx.viewport_size.height
            )));
        }

        let mut frame = self.take_frame(width, height)?;
        let bg = self.background_color(ctx).to_rgba8();
        frame.fill(tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));

        if let Some(image) = ctx.image {
            Self::draw_image(&mut frame, ctx, image);
        }
        Self::draw_strokes(&mut frame, ctx)?;
        if let Some(cursor) = ctx.brush_cursor {
            Self::draw_cursor(&mut frame, cursor);
        }

        self.frame = Some(frame);
        Ok(())
    }
}
