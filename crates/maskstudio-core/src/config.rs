//! Studio configuration.
//!
//! All values have defaults matching the stock editor; a JSON document can
//! override any subset of them.

use crate::artifact::{AspectRatio, ResolutionTier};
use crate::error::{StudioError, StudioResult};
use peniko::Color;
use serde::{Deserialize, Serialize};

/// An RGBA color that survives a serde round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Full-opacity red, the reserved mask marker.
    pub fn marker_red() -> Self {
        Self::new(255, 0, 0, 255)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// How Erase-tool strokes contribute to the flattened mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErasePolicy {
    /// Erase strokes are drawn with the marker like paint strokes.
    #[default]
    MarkAsEdit,
    /// Erase strokes carve previously painted marker away.
    Subtract,
}

/// Viewport limits and zoom steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Fraction of the viewport an image fills after fit-to-view.
    pub fit_margin: f64,
    pub zoom_in_step: f64,
    pub zoom_out_step: f64,
    pub wheel_zoom_speed: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 10.0,
            fit_margin: 0.8,
            zoom_in_step: 1.2,
            zoom_out_step: 0.8,
            wheel_zoom_speed: 0.05,
        }
    }
}

/// Brush width limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    pub default_width: f64,
    pub min_width: f64,
    pub max_width: f64,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            default_width: 20.0,
            min_width: 1.0,
            max_width: 50.0,
        }
    }
}

impl BrushConfig {
    pub fn clamp(&self, width: f64) -> f64 {
        width.max(self.min_width).min(self.max_width)
    }
}

/// Undo history bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of snapshots kept; `None` keeps everything.
    pub limit: Option<usize>,
}

/// Marker appearance for both the flattened mask and the live overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    pub marker: SerializableColor,
    /// Opacity of marker strokes in the flattened raster.
    pub marker_opacity: f32,
    /// Opacity of the stroke layer in the on-screen overlay.
    pub overlay_opacity: f32,
    pub erase_policy: ErasePolicy,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            marker: SerializableColor::marker_red(),
            marker_opacity: 0.7,
            overlay_opacity: 0.5,
            erase_policy: ErasePolicy::default(),
        }
    }
}

/// Defaults applied to generation requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationDefaults {
    pub aspect_ratio: AspectRatio,
    pub resolution: ResolutionTier,
    /// Number of prior turns forwarded with each request.
    pub max_prior_turns: usize,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::Landscape4x3,
            resolution: ResolutionTier::TwoK,
            max_prior_turns: 10,
        }
    }
}

/// Top-level configuration for a studio instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub viewport: ViewportConfig,
    pub brush: BrushConfig,
    pub history: HistoryConfig,
    pub mask: MaskConfig,
    pub generation: GenerationDefaults,
    pub upload: crate::artifact::UploadPolicy,
}

impl StudioConfig {
    /// Parse and validate a configuration document; missing keys keep
    /// their defaults.
    pub fn from_json(json: &str) -> StudioResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StudioError::InvalidParameter(format!("configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject bounds that cannot be satisfied.
    pub fn validate(&self) -> StudioResult<()> {
        let viewport = &self.viewport;
        check_range("viewport scale", viewport.min_scale, viewport.max_scale)?;
        check_positive("viewport.fit_margin", viewport.fit_margin)?;
        check_positive("viewport.zoom_in_step", viewport.zoom_in_step)?;
        check_positive("viewport.zoom_out_step", viewport.zoom_out_step)?;
        // The wheel zooms by 1 - speed, which must stay positive
        if !(viewport.wheel_zoom_speed.is_finite() && (0.0..1.0).contains(&viewport.wheel_zoom_speed)) {
            return Err(invalid(format!(
                "viewport.wheel_zoom_speed must be in [0, 1), got {}",
                viewport.wheel_zoom_speed
            )));
        }

        let brush = &self.brush;
        check_range("brush width", brush.min_width, brush.max_width)?;
        if !(brush.min_width..=brush.max_width).contains(&brush.default_width) {
            return Err(invalid(format!(
                "brush.default_width {} outside [{}, {}]",
                brush.default_width, brush.min_width, brush.max_width
            )));
        }

        if self.history.limit == Some(0) {
            return Err(invalid("history.limit must be at least 1".to_string()));
        }

        check_opacity("mask.marker_opacity", self.mask.marker_opacity)?;
        check_opacity("mask.overlay_opacity", self.mask.overlay_opacity)?;

        if self.upload.max_bytes == 0 {
            return Err(invalid("upload.max_bytes must be positive".to_string()));
        }
        Ok(())
    }

    /// Serialize the configuration to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn invalid(message: String) -> StudioError {
    StudioError::InvalidParameter(message)
}

fn check_range(name: &str, min: f64, max: f64) -> StudioResult<()> {
    if min.is_finite() && max.is_finite() && min > 0.0 && min <= max {
        Ok(())
    } else {
        Err(invalid(format!("{name}: expected 0 < min <= max, got min {min}, max {max}")))
    }
}

fn check_positive(name: &str, value: f64) -> StudioResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be positive, got {value}")))
    }
}

fn check_opacity(name: &str, value: f32) -> StudioResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be in [0, 1], got {value}")))
    }
}
