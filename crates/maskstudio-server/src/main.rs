//! MaskStudio Gallery Server
//!
//! Serves the flat-file gallery over a small JSON API.
//!
//! ## Routes
//!
//! ```text
//! GET    /health                      -> "ok"
//! GET    /api/images[?kind=upscaled]  -> { "images": [metadata] }
//! POST   /api/images                  <- { "images": [{ ...metadata, "data": "<base64>" }] }
//! DELETE /api/images                  -> clear the gallery
//! DELETE /api/images/{id}             -> delete one artifact
//! GET    /api/images/{id}/file        -> raw image bytes
//! GET    /api/images/{id}/thumbnail   -> JPEG thumbnail
//! ```

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use maskstudio_core::{ArtifactMetadata, FileGallery, ImageFormat, ImageKind, StorageError, WorkingImage};
use maskstudio_render::{THUMBNAIL_MAX_SIDE, thumbnail};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

const DEFAULT_ADDR: &str = "0.0.0.0:3040";

/// Base64 inflates payloads by a third; leave room for a batch of uploads.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
struct AppState {
    gallery: Arc<FileGallery>,
}

impl AppState {
    fn new(gallery: FileGallery) -> Self {
        Self {
            gallery: Arc::new(gallery),
        }
    }

    /// Run a gallery call on the blocking pool.
    async fn with_gallery<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&FileGallery) -> Result<T, ApiError> + Send + 'static,
    {
        let gallery = Arc::clone(&self.gallery);
        tokio::task::spawn_blocking(move || f(&gallery))
            .await
            .map_err(|e| ApiError::Internal(format!("Gallery task failed: {}", e)))?
    }
}

/// Error returned from a handler, rendered as `{ "error": message }`.
#[derive(Debug, Error)]
enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => ApiError::NotFound(format!("Image not found: {}", id)),
            StorageError::InvalidId(id) => ApiError::BadRequest(format!("Invalid image id: {}", id)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(message) => {
                error!("Request failed: {}", message);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Optional listing filter.
#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    kind: Option<ImageKind>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ImageList {
    images: Vec<ArtifactMetadata>,
}

/// One uploaded artifact: its metadata plus the base64 bytes.
#[derive(Debug, Serialize, Deserialize)]
struct UploadedArtifact {
    #[serde(flatten)]
    metadata: ArtifactMetadata,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SaveRequest {
    images: Vec<UploadedArtifact>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct SaveResponse {
    success: bool,
    count: usize,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct SuccessResponse {
    success: bool,
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/images", get(list_images).post(save_images).delete(clear_images))
        .route("/api/images/{id}", delete(delete_image))
        .route("/api/images/{id}/file", get(image_file))
        .route("/api/images/{id}/thumbnail", get(image_thumbnail))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn gallery_dir() -> Result<PathBuf, StorageError> {
    match std::env::var_os("MASKSTUDIO_GALLERY_DIR") {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => FileGallery::default_path(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maskstudio_server=info,tower_http=info".into()),
        )
        .init();

    let addr: SocketAddr = std::env::var("MASKSTUDIO_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;
    let gallery = FileGallery::new(gallery_dir()?)?;
    info!("Gallery directory: {}", gallery.base_path().display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("MaskStudio gallery server listening on {}", addr);
    axum::serve(listener, app(AppState::new(gallery))).await?;
    Ok(())
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ImageList>, ApiError> {
    let mut images = state.with_gallery(|gallery| Ok(gallery.read_metadata()?)).await?;
    if let Some(kind) = query.kind {
        images.retain(|image| image.kind == kind);
    }
    Ok(Json(ImageList { images }))
}

async fn save_images(
    State(state): State<AppState>,
    Json(request): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, ApiError> {
    if request.images.is_empty() {
        return Err(ApiError::BadRequest("No images provided".to_string()));
    }

    let images = request
        .images
        .into_iter()
        .map(|upload| {
            let data = WorkingImage::decode_base64(&upload.data).map_err(|e| {
                ApiError::BadRequest(format!("Invalid image data for {}: {}", upload.metadata.id, e))
            })?;
            if data.is_empty() {
                return Err(ApiError::BadRequest(format!("Empty image data for {}", upload.metadata.id)));
            }
            Ok(WorkingImage::from_parts(upload.metadata, data))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let count = images.len();
    state
        .with_gallery(move |gallery| Ok(gallery.write_artifacts(&images)?))
        .await?;
    info!("Stored {} image(s)", count);
    Ok(Json(SaveResponse { success: true, count }))
}

async fn clear_images(State(state): State<AppState>) -> Result<Json<SuccessResponse>, ApiError> {
    state.with_gallery(|gallery| Ok(gallery.remove_all()?)).await?;
    info!("Cleared gallery");
    Ok(Json(SuccessResponse { success: true }))
}

async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let target = id.clone();
    state
        .with_gallery(move |gallery| Ok(gallery.remove_artifact(&target)?))
        .await?;
    info!("Deleted image {}", id);
    Ok(Json(SuccessResponse { success: true }))
}

async fn image_file(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let data = state.with_gallery(move |gallery| Ok(gallery.read_image(&id)?)).await?;
    let mime = ImageFormat::from_magic_bytes(&data)
        .unwrap_or(ImageFormat::Png)
        .mime_type();
    Ok(([(header::CONTENT_TYPE, mime)], data).into_response())
}

async fn image_thumbnail(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let jpeg = state
        .with_gallery(move |gallery| {
            let data = gallery.read_image(&id)?;
            thumbnail(&data, THUMBNAIL_MAX_SIDE).map_err(|e| {
                warn!("Thumbnail failed for {}: {}", id, e);
                ApiError::Internal(format!("Thumbnail failed: {}", e))
            })
        })
        .await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response())
}
