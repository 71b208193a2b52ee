//! Contract with the image generation collaborator.
//!
//! The core never talks to a model directly. It builds requests, forwards the
//! prior conversation turns and keeps whatever continuation state comes back
//! without looking inside it.

use crate::artifact::{AspectRatio, GenerationConfig, ResolutionTier};
use crate::gallery::BoxFuture;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Opaque per-turn state returned by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

/// One piece of a conversation turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnPart {
    Text(String),
    Image { mime_type: String, data: Vec<u8> },
}

/// One exchange with the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<TurnPart>,
    pub continuation: Option<ContinuationToken>,
}

impl Turn {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![TurnPart::Text(text.into())],
            continuation: None,
        }
    }
}

/// Edit of an existing image.
#[derive(Debug, Clone, PartialEq)]
pub struct EditRequest {
    /// Flattened composite when `masked`, otherwise the original bytes.
    pub image: Vec<u8>,
    pub instruction: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: ResolutionTier,
    pub prior_turns: Vec<Turn>,
    /// Whether `image` carries marker strokes.
    pub masked: bool,
}

/// Fresh generation from a prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Aspect ratio, resolution and style parameters.
    pub config: GenerationConfig,
    pub prior_turns: Vec<Turn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProducedImage {
    pub data: Vec<u8>,
    pub continuation: Option<ContinuationToken>,
}

/// Successful collaborator reply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationResponse {
    pub images: Vec<ProducedImage>,
    /// Conversation to thread into the next request.
    pub turns: Vec<Turn>,
}

/// Collaborator failure. The message is preserved verbatim.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("response contained no image")]
    EmptyResponse,
    #[error("collaborator not configured: {0}")]
    NotConfigured(String),
    #[error("{0}")]
    Other(String),
}

pub type GenerationResult<T> = Result<T, GenerationError>;

/// The generation collaborator.
///
/// Timeouts and retries are the implementation's business; the core only
/// needs each call to eventually settle.
#[cfg(not(target_arch = "wasm32"))]
pub trait GenerationClient: Send + Sync {
    fn submit_edit(&self, request: EditRequest) -> BoxFuture<'_, GenerationResult<GenerationResponse>>;

    fn submit_generate(&self, request: GenerateRequest) -> BoxFuture<'_, GenerationResult<GenerationResponse>>;
}

/// The generation collaborator (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait GenerationClient {
    fn submit_edit(&self, request: EditRequest) -> BoxFuture<'_, GenerationResult<GenerationResponse>>;

    fn submit_generate(&self, request: GenerateRequest) -> BoxFuture<'_, GenerationResult<GenerationResponse>>;
}

/// Upscale magnification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum UpscaleFactor {
    #[default]
    X2,
    X4,
}

impl UpscaleFactor {
    pub fn factor(self) -> u32 {
        match self {
            UpscaleFactor::X2 => 2,
            UpscaleFactor::X4 => 4,
        }
    }
}

impl TryFrom<u32> for UpscaleFactor {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(UpscaleFactor::X2),
            4 => Ok(UpscaleFactor::X4),
            other => Err(format!("upscale factor must be 2 or 4, got {other}")),
        }
    }
}

impl From<UpscaleFactor> for u32 {
    fn from(factor: UpscaleFactor) -> Self {
        factor.factor()
    }
}

/// Super-resolution model offered for 4x upscales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UpscaleModel {
    #[default]
    #[serde(rename = "RealESRGAN_x4plus")]
    General,
    #[serde(rename = "RealESRGAN_x4plus_anime_6B")]
    Anime,
}

impl UpscaleModel {
    /// Model that actually runs for `factor`. 2x always uses the dedicated
    /// 2x model.
    pub fn resolve(self, factor: UpscaleFactor) -> &'static str {
        match (factor, self) {
            (UpscaleFactor::X2, _) => "RealESRGAN_x2plus",
            (UpscaleFactor::X4, UpscaleModel::General) => "RealESRGAN_x4plus",
            (UpscaleFactor::X4, UpscaleModel::Anime) => "RealESRGAN_x4plus_anime_6B",
        }
    }
}

/// Super-resolution of an existing image.
#[derive(Debug, Clone, PartialEq)]
pub struct UpscaleRequest {
    pub image: Vec<u8>,
    pub factor: UpscaleFactor,
    pub model: UpscaleModel,
}

/// The upscaling collaborator. Returns the encoded upscaled raster.
#[cfg(not(target_arch = "wasm32"))]
pub trait UpscaleClient: Send + Sync {
    fn submit_upscale(&self, request: UpscaleRequest) -> BoxFuture<'_, GenerationResult<Vec<u8>>>;

    /// Whether the backend is reachable.
    fn health(&self) -> BoxFuture<'_, GenerationResult<()>>;
}

/// The upscaling collaborator (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait UpscaleClient {
    fn submit_upscale(&self, request: UpscaleRequest) -> BoxFuture<'_, GenerationResult<Vec<u8>>>;

    fn health(&self) -> BoxFuture<'_, GenerationResult<()>>;
}

/// Turn keyword lists into a descriptive prompt.
///
/// Prompts longer than 50 characters that contain spaces and no commas are
/// treated as already descriptive and returned unchanged.
pub fn optimize_prompt(prompt: &str) -> String {
    if prompt.chars().count() > 50 && prompt.contains(' ') && !prompt.contains(',') {
        return prompt.to_string();
    }

    format!(
        "Create an image with the following characteristics: {prompt}.\n\
         Focus on composition, lighting, and atmosphere to create a cohesive scene."
    )
}

/// The most recent `max` turns.
pub fn limit_turns(turns: &[Turn], max: usize) -> Vec<Turn> {
    let start = turns.len().saturating_sub(max);
    turns[start..].to_vec()
}

/// Instruction sent alongside a marker-flattened image.
pub fn masked_edit_instruction(instruction: &str) -> String {
    format!(
        "In the provided image, the areas marked in red indicate where changes should be made. \
         {instruction}. Change only these marked areas while keeping everything else exactly the same, \
         preserving the original style, lighting, and composition."
    )
}

/// Failure of one batch item.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure<E> {
    pub index: usize,
    pub error: E,
}

/// Outcome of a sequential batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport<T, E> {
    pub succeeded: Vec<T>,
    pub failures: Vec<BatchFailure<E>>,
}

impl<T, E> Default for BatchReport<T, E> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T, E> BatchReport<T, E> {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failures.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run `count` steps one after another, threading `state` through them.
///
/// Each step is fully awaited before the next starts. A failed step is
/// recorded and the batch continues with whatever state that step handed
/// back.
pub async fn run_batch<S, T, E, F, Fut>(count: usize, mut state: S, mut step: F) -> (S, BatchReport<T, E>)
where
    F: FnMut(usize, S) -> Fut,
    Fut: Future<Output = (S, Result<T, E>)>,
{
    let mut report = BatchReport::default();
    for index in 0..count {
        let (next, result) = step(index, state).await;
        state = next;
        match result {
            Ok(item) => report.succeeded.push(item),
            Err(error) => report.failures.push(BatchFailure { index, error }),
        }
    }
    (state, report)
}
