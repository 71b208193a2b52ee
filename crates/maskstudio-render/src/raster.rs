//! Raster decode/encode and stroke painting shared by the compositor and
//! the overlay renderer.

use crate::error::{CompositeError, CompositeResult};
use kurbo::{Affine, Size};
use maskstudio_core::{Stroke, StrokeTool};
use maskstudio_core::config::SerializableColor;
use tiny_skia::{
    BlendMode, ColorU8, FillRule, IntSize, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Transform,
};

/// A decoded source image, premultiplied RGBA.
#[derive(Clone)]
pub struct SourceImage {
    pixmap: Pixmap,
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl SourceImage {
    /// Decode PNG, JPEG or WebP bytes.
    pub fn decode(bytes: &[u8]) -> CompositeResult<Self> {
        if bytes.is_empty() {
            return Err(CompositeError::MissingSourceImage);
        }

        let rgba = image::load_from_memory(bytes)
            .map_err(|e| CompositeError::Decode(e.to_string()))?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        let size = IntSize::from_wh(width, height).ok_or(CompositeError::Allocation { width, height })?;

        let mut data = rgba.into_raw();
        for px in data.chunks_exact_mut(4) {
            let premultiplied = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
            px[0] = premultiplied.red();
            px[1] = premultiplied.green();
            px[2] = premultiplied.blue();
            px[3] = premultiplied.alpha();
        }

        let pixmap = Pixmap::from_vec(data, size).ok_or(CompositeError::Allocation { width, height })?;
        Ok(Self { pixmap })
    }

    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self { pixmap }
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Native size, for laying the image out in content space.
    pub fn size(&self) -> Size {
        Size::new(self.width() as f64, self.height() as f64)
    }
}

/// Allocate a transparent raster.
pub fn new_pixmap(width: u32, height: u32) -> CompositeResult<Pixmap> {
    Pixmap::new(width, height).ok_or(CompositeError::Allocation { width, height })
}

/// Straight (non-premultiplied) RGBA bytes of `pixmap`.
pub fn demultiplied_rgba(pixmap: &Pixmap) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(pixmap.pixels().len() * 4);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    rgba
}

/// Encode `pixmap` as an 8-bit RGBA PNG.
pub fn encode_png(pixmap: &Pixmap) -> CompositeResult<Vec<u8>> {
    let rgba = demultiplied_rgba(pixmap);
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, pixmap.width(), pixmap.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder.write_header().map_err(|e| {
            log::error!("Failed to write PNG header: {:?}", e);
            CompositeError::Encode(e.to_string())
        })?;
        writer.write_image_data(&rgba).map_err(|e| {
            log::error!("Failed to write PNG data: {:?}", e);
            CompositeError::Encode(e.to_string())
        })?;
    }
    Ok(png_data)
}

/// Convert a kurbo affine into a tiny-skia transform.
pub fn to_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

/// Solid paint for the marker color at `opacity`.
pub fn marker_paint(color: SerializableColor, opacity: f32) -> Paint<'static> {
    let alpha = (color.a as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, alpha);
    paint.anti_alias = true;
    paint
}

/// Paint one stroke onto `pixmap` under `transform`.
///
/// Strokes whose points all coincide are filled as a disc of the stroke
/// width; everything else is a polyline with round caps and joins. When
/// `erase_cuts` is set, Erase strokes clear what is below them instead of
/// painting.
pub fn paint_stroke(pixmap: &mut Pixmap, stroke: &Stroke, paint: &Paint<'_>, transform: Transform, erase_cuts: bool) {
    let Some(first) = stroke.points().first() else {
        return;
    };

    let mut paint = paint.clone();
    if erase_cuts && stroke.tool == StrokeTool::Erase {
        paint.blend_mode = BlendMode::DestinationOut;
        paint.set_color_rgba8(0, 0, 0, 255);
    }

    if stroke.is_dot() {
        let radius = (stroke.width / 2.0) as f32;
        if let Some(path) = PathBuilder::from_circle(first.x as f32, first.y as f32, radius) {
            pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
        }
        return;
    }

    let mut builder = PathBuilder::new();
    builder.move_to(first.x as f32, first.y as f32);
    for point in &stroke.points()[1..] {
        builder.line_to(point.x as f32, point.y as f32);
    }
    let Some(path) = builder.finish() else {
        return;
    };

    let line = tiny_skia::Stroke {
        width: stroke.width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    };
    pixmap.stroke_path(&path, &paint, &line, transform, None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Pixmap {
        let mut pixmap = new_pixmap(width, height).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]));
        pixmap
    }

    #[test]
    fn test_png_roundtrip_through_decode() {
        let pixmap = solid(7, 5, [10, 200, 30, 255]);
        let bytes = encode_png(&pixmap).unwrap();
        assert!(bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]));

        let decoded = SourceImage::decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (7, 5));
        assert_eq!(decoded.pixmap().data(), pixmap.data());
        assert_eq!(decoded.size(), Size::new(7.0, 5.0));
    }

    #[test]
    fn test_translucent_pixels_survive_roundtrip() {
        let pixmap = solid(2, 2, [255, 0, 0, 128]);
        let decoded = SourceImage::decode(&encode_png(&pixmap).unwrap()).unwrap();
        let px = decoded.pixmap().pixel(0, 0).unwrap().demultiply();
        assert_eq!(px.alpha(), 128);
        assert!(px.red() >= 254);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(SourceImage::decode(&[]), Err(CompositeError::MissingSourceImage)));
        assert!(matches!(SourceImage::decode(b"not an image"), Err(CompositeError::Decode(_))));
    }

    #[test]
    fn test_transform_matches_affine() {
        let affine = Affine::translate((30.0, 40.0)) * Affine::scale(2.0);
        let t = to_transform(affine);
        let mut p = [tiny_skia::Point::from_xy(5.0, 6.0)];
        t.map_points(&mut p);
        let expected = affine * Point::new(5.0, 6.0);
        assert!((p[0].x as f64 - expected.x).abs() < 1e-4);
        assert!((p[0].y as f64 - expected.y).abs() < 1e-4);
    }

    #[test]
    fn test_marker_paint_alpha() {
        let paint = marker_paint(SerializableColor::marker_red(), 0.7);
        let tiny_skia::Shader::SolidColor(color) = paint.shader else {
            panic!("marker paint should be a solid color");
        };
        assert!((color.alpha() - 0.7).abs() < 1.0 / 255.0);
        assert!((color.red() - 1.0).abs() < 1e-6);
        assert!(color.green().abs() < 1e-6);
    }

    #[test]
    fn test_paint_dot_stroke() {
        let mut pixmap = new_pixmap(40, 40).unwrap();
        let dot = Stroke::from_points(StrokeTool::Paint, 10.0, vec![Point::new(20.0, 20.0); 2]);
        let paint = marker_paint(SerializableColor::marker_red(), 1.0);
        paint_stroke(&mut pixmap, &dot, &paint, Transform::identity(), false);

        assert_eq!(pixmap.pixel(20, 20).unwrap().alpha(), 255);
        assert_eq!(pixmap.pixel(20, 28).unwrap().alpha(), 0);
    }
}
