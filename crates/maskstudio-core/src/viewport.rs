//! Viewport transform for pan/zoom over the loaded image.

use crate::config::ViewportConfig;
use crate::error::{StudioError, StudioResult};
use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Maps pointer coordinates (viewport top-left origin) to content
/// coordinates (image top-left origin, unscaled) and back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    /// Current translation offset (pan) in pointer space.
    pub offset: Vec2,
    /// Current zoom level.
    scale: f64,
    /// Minimum allowed zoom level
    pub min_scale: f64,
    /// Maximum allowed zoom level
    pub max_scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            min_scale: 0.1,
            max_scale: 10.0,
        }
    }
}

impl Viewport {
    /// Create a viewport with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a viewport using the configured scale limits.
    pub fn with_config(config: &ViewportConfig) -> Self {
        Self {
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            ..Self::default()
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Transform from content space to pointer space.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Transform from pointer space to content space.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    /// `(pointer - offset) / scale`
    pub fn to_content(&self, pointer: Point) -> Point {
        self.inverse_transform() * pointer
    }

    pub fn to_pointer(&self, content: Point) -> Point {
        self.transform() * content
    }

    /// Pan by a delta in pointer coordinates. Unclamped.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom by `factor`, keeping the content point under `anchor` fixed.
    pub fn zoom(&mut self, factor: f64, anchor: Point) -> StudioResult<()> {
        if factor <= 0.0 || !factor.is_finite() {
            return Err(StudioError::InvalidParameter(format!(
                "zoom factor must be positive, got {factor}"
            )));
        }

        let new_scale = self.clamp_scale(self.scale * factor);
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return Ok(());
        }

        let content = self.to_content(anchor);
        self.scale = new_scale;

        // Re-anchor so `content` lands back under `anchor`
        self.offset = Vec2::new(
            anchor.x - content.x * self.scale,
            anchor.y - content.y * self.scale,
        );
        Ok(())
    }

    /// Reset to identity, or fit `image` inside `viewport` when both are known.
    pub fn reset_view(&mut self, image: Option<Size>, viewport: Size, fit_margin: f64) {
        match image {
            Some(image) if image.width > 0.0 && image.height > 0.0 => {
                self.fit_to_image(image, viewport, fit_margin)
            }
            _ => {
                self.offset = Vec2::ZERO;
                self.scale = 1.0;
            }
        }
    }

    /// Bounds are public and may be inverted; `max` wins.
    fn clamp_scale(&self, scale: f64) -> f64 {
        scale.max(self.min_scale).min(self.max_scale)
    }

    /// Scale the image to `fit_margin` of the viewport and center it.
    fn fit_to_image(&mut self, image: Size, viewport: Size, fit_margin: f64) {
        let scale_x = viewport.width * fit_margin / image.width;
        let scale_y = viewport.height * fit_margin / image.height;
        let fit = scale_x.min(scale_y);
        self.scale = if fit.is_finite() && fit > 0.0 {
            self.clamp_scale(fit)
        } else {
            1.0
        };

        self.offset = Vec2::new(
            (viewport.width - image.width * self.scale) / 2.0,
            (viewport.height - image.height * self.scale) / 2.0,
        );
    }
}
