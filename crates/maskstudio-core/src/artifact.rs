//! Working images, their generation parameters and the upload boundary.

use crate::generation::ContinuationToken;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use web_time::{SystemTime, UNIX_EPOCH};

/// Prompt recorded for images that arrive through upload.
pub const UPLOAD_PROMPT: &str = "Uploaded image";

/// Default upload ceiling (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Image format for stored image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 3] = [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP];

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::WebP => "webp",
        }
    }

    /// Get MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }

        None
    }
}

/// Output aspect ratio requested from the generation collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[default]
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "5:4")]
    Landscape5x4,
    #[serde(rename = "4:5")]
    Portrait4x5,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 7] = [
        AspectRatio::Square,
        AspectRatio::Landscape16x9,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape5x4,
        AspectRatio::Portrait4x5,
    ];

    /// Wire label, e.g. `"16:9"`.
    pub fn label(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape5x4 => "5:4",
            AspectRatio::Portrait4x5 => "4:5",
        }
    }

    /// Width divided by height.
    pub fn ratio(&self) -> f64 {
        match self {
            AspectRatio::Square => 1.0,
            AspectRatio::Landscape16x9 => 16.0 / 9.0,
            AspectRatio::Portrait9x16 => 9.0 / 16.0,
            AspectRatio::Landscape4x3 => 4.0 / 3.0,
            AspectRatio::Portrait3x4 => 3.0 / 4.0,
            AspectRatio::Landscape5x4 => 5.0 / 4.0,
            AspectRatio::Portrait4x5 => 4.0 / 5.0,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ratio| ratio.label() == label)
    }
}

/// Output resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResolutionTier {
    #[serde(rename = "1K")]
    OneK,
    #[default]
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ResolutionTier {
    pub fn label(&self) -> &'static str {
        match self {
            ResolutionTier::OneK => "1K",
            ResolutionTier::TwoK => "2K",
            ResolutionTier::FourK => "4K",
        }
    }
}

/// Model family requested from the generation collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    #[serde(rename = "gemini-2.5-flash")]
    Flash,
    #[serde(rename = "gemini-3-pro")]
    Pro,
}

/// Parameters an image was produced with. Opaque to the editing core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: ResolutionTier,
    /// Number of images requested in the batch.
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lighting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub grounding: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            aspect_ratio: AspectRatio::default(),
            resolution: ResolutionTier::default(),
            count: 1,
            model: None,
            style: None,
            lighting: None,
            camera: None,
            mood: None,
            negative_prompt: None,
            grounding: false,
        }
    }
}

impl GenerationConfig {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// How a working image came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    #[default]
    Generated,
    Edited,
    Upscaled,
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Persisted description of an artifact. Carries no pixel data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub id: String,
    pub prompt: String,
    /// Creation time, ms since epoch.
    pub created_at: u64,
    pub config: GenerationConfig,
    pub kind: ImageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation: Option<ContinuationToken>,
}

/// An image owned by the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingImage {
    pub id: String,
    /// Encoded raster bytes (PNG, JPEG or WebP).
    pub data: Vec<u8>,
    pub prompt: String,
    pub created_at: u64,
    pub config: GenerationConfig,
    pub kind: ImageKind,
    /// Collaborator state for multi-turn edits, passed through untouched.
    pub continuation: Option<ContinuationToken>,
}

impl WorkingImage {
    /// Create a new image with a fresh id and the current timestamp.
    pub fn new(data: Vec<u8>, prompt: impl Into<String>, config: GenerationConfig, kind: ImageKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            data,
            prompt: prompt.into(),
            created_at: now_millis(),
            config,
            kind,
            continuation: None,
        }
    }

    /// An image that entered through upload.
    pub fn uploaded(data: Vec<u8>, config: GenerationConfig) -> Self {
        Self::new(data, UPLOAD_PROMPT, config, ImageKind::Generated)
    }

    pub fn with_continuation(mut self, token: Option<ContinuationToken>) -> Self {
        self.continuation = token;
        self
    }

    /// Rebuild from persisted metadata and raster bytes.
    pub fn from_parts(metadata: ArtifactMetadata, data: Vec<u8>) -> Self {
        Self {
            id: metadata.id,
            data,
            prompt: metadata.prompt,
            created_at: metadata.created_at,
            config: metadata.config,
            kind: metadata.kind,
            continuation: metadata.continuation,
        }
    }

    pub fn metadata(&self) -> ArtifactMetadata {
        ArtifactMetadata::from(self)
    }

    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_magic_bytes(&self.data)
    }

    pub fn data_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// Decode a base64 payload, as exchanged with the gallery server.
    pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(encoded)
    }
}

impl From<&WorkingImage> for ArtifactMetadata {
    fn from(image: &WorkingImage) -> Self {
        Self {
            id: image.id.clone(),
            prompt: image.prompt.clone(),
            created_at: image.created_at,
            config: image.config.clone(),
            kind: image.kind,
            continuation: image.continuation.clone(),
        }
    }
}

/// Download name for an exported image. The extension follows the payload;
/// unrecognized bytes are named as PNG.
pub fn export_file_name(image: &WorkingImage) -> String {
    let format = ImageFormat::from_magic_bytes(&image.data).unwrap_or(ImageFormat::Png);
    format!("maskstudio-{}.{}", image.created_at, format.extension())
}

/// Rejections at the file-input boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("file is empty")]
    Empty,
    #[error("file is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },
    #[error("file is not a PNG, JPEG or WebP image")]
    UnsupportedFormat,
}

/// Limits applied to user-supplied files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadPolicy {
    pub max_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    /// Check size and sniff the format.
    pub fn validate(&self, data: &[u8]) -> Result<ImageFormat, UploadError> {
        if data.is_empty() {
            return Err(UploadError::Empty);
        }
        if data.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: data.len(),
                max: self.max_bytes,
            });
        }
        ImageFormat::from_magic_bytes(data).ok_or(UploadError::UnsupportedFormat)
    }
}
