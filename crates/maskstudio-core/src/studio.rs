//! Session orchestration: selection, persistence and submissions.
//!
//! `Studio` owns the session list, the editor for the active image and the
//! conversation turns. Work that crosses the process boundary is split so the
//! studio is never borrowed while a remote call is pending: `begin_*` claims
//! the single-flight slot and returns a self-contained job, the caller awaits
//! it, and `complete_*` folds the result back in. A slot is released when
//! the job holding it is dropped, so cancelled or abandoned work never leaves
//! its image locked.

use crate::artifact::{ArtifactMetadata, GenerationConfig, ImageKind, WorkingImage};
use crate::config::StudioConfig;
use crate::editor::EditorContext;
use crate::error::{StudioError, StudioResult};
use crate::gallery::{BoxFuture, Gallery};
use crate::generation::{
    BatchFailure, EditRequest, GenerateRequest, GenerationClient, GenerationError, GenerationResponse,
    GenerationResult, Turn, UpscaleClient, UpscaleFactor, UpscaleModel, UpscaleRequest, limit_turns,
    masked_edit_instruction, optimize_prompt, run_batch,
};
use crate::session::Session;
use crate::stroke::StrokeLog;
use kurbo::Size;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Produces the flattened raster sent with a masked edit.
pub trait MaskFlattener {
    /// Draw `strokes`, captured against an image laid out `display_width`
    /// units wide, onto `source` at native resolution and encode the result.
    fn flatten(&self, source: &[u8], display_width: f64, strokes: &StrokeLog) -> StudioResult<Vec<u8>>;
}

/// Pending gallery write. Local state has already changed when this is
/// returned; awaiting it only reports whether persistence succeeded.
pub type Persistence = BoxFuture<'static, StudioResult<()>>;

/// Single-flight slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubmissionKey {
    /// Edit of the image with this id.
    Image(String),
    /// Prompt-only generation batch.
    Generate,
}

impl std::fmt::Display for SubmissionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionKey::Image(id) => write!(f, "image {id}"),
            SubmissionKey::Generate => write!(f, "generation"),
        }
    }
}

type Slots = Arc<Mutex<HashSet<SubmissionKey>>>;

/// A claimed single-flight slot, freed on drop.
#[derive(Debug)]
struct SlotGuard {
    key: SubmissionKey,
    slots: Slots,
}

impl SlotGuard {
    fn claim(slots: &Slots, key: SubmissionKey) -> StudioResult<Self> {
        let mut held = slots.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(key.clone()) {
            return Err(StudioError::OperationInProgress(key.to_string()));
        }
        Ok(Self {
            key,
            slots: Arc::clone(slots),
        })
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// An edit that holds its image's single-flight slot.
#[derive(Debug)]
#[must_use = "a submission holds its slot until completed or dropped"]
pub struct Submission {
    image_id: String,
    /// Instruction as typed, recorded as the new image's prompt.
    instruction: String,
    request: EditRequest,
    slot: SlotGuard,
}

impl Submission {
    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn request(&self) -> &EditRequest {
        &self.request
    }

    pub fn key(&self) -> SubmissionKey {
        self.slot.key.clone()
    }
}

/// An upscale of one image. Shares the image's slot with edits.
#[derive(Debug)]
#[must_use = "an upscale holds its slot until completed or dropped"]
pub struct UpscaleSubmission {
    image_id: String,
    /// Prompt and parameters carried over from the source image.
    prompt: String,
    config: GenerationConfig,
    request: UpscaleRequest,
    slot: SlotGuard,
}

impl UpscaleSubmission {
    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn request(&self) -> &UpscaleRequest {
        &self.request
    }

    pub fn key(&self) -> SubmissionKey {
        self.slot.key.clone()
    }
}

/// Result of folding an edit back into the session.
#[must_use]
pub struct EditOutcome {
    /// Ids of the produced images, in session order.
    pub added: Vec<String>,
    /// Whether the produced image became active. False when the user moved
    /// to another image while the edit was in flight.
    pub activated: bool,
    pub persistence: Persistence,
}

/// A generation batch detached from the studio.
#[must_use = "a batch holds the generation slot until completed or dropped"]
pub struct BatchJob<C: ?Sized> {
    client: Arc<C>,
    prompt: String,
    config: GenerationConfig,
    count: usize,
    turns: Vec<Turn>,
    max_prior_turns: usize,
    slot: SlotGuard,
}

/// What a batch produced, before it is added to the session. Keeps the
/// generation slot until completed or dropped.
pub struct BatchOutput {
    turns: Vec<Turn>,
    images: Vec<WorkingImage>,
    failures: Vec<BatchFailure<GenerationError>>,
    slot: SlotGuard,
}

/// Result of folding a batch back into the session.
#[must_use]
pub struct GenerateOutcome {
    pub added: Vec<String>,
    pub failures: Vec<BatchFailure<GenerationError>>,
    /// `None` when nothing was produced.
    pub persistence: Option<Persistence>,
}

impl<C: GenerationClient + ?Sized + 'static> BatchJob<C> {
    /// Issue the requests one after another, threading returned turns into
    /// the next request.
    pub async fn run(self) -> BatchOutput {
        let BatchJob {
            client,
            prompt,
            config,
            count,
            turns,
            max_prior_turns,
            slot,
        } = self;

        let (turns, report) = run_batch(count, turns, move |index, turns: Vec<Turn>| {
            let client = Arc::clone(&client);
            let request = GenerateRequest {
                prompt: optimize_prompt(&prompt),
                config: config.clone(),
                prior_turns: limit_turns(&turns, max_prior_turns),
            };
            let prompt = prompt.clone();
            let config = config.clone();
            async move {
                match client.submit_generate(request).await {
                    Ok(response) if !response.images.is_empty() => {
                        let images = produced_images(response.images, &prompt, &config, ImageKind::Generated);
                        (response.turns, Ok(images))
                    }
                    Ok(_) => {
                        log::error!("Generation {} of batch returned no image", index + 1);
                        (turns, Err(GenerationError::EmptyResponse))
                    }
                    Err(e) => {
                        log::error!("Generation {} of batch failed: {}", index + 1, e);
                        (turns, Err(e))
                    }
                }
            }
        })
        .await;

        BatchOutput {
            turns,
            images: report.succeeded.into_iter().flatten().collect(),
            failures: report.failures,
            slot,
        }
    }
}

fn produced_images(
    produced: Vec<crate::generation::ProducedImage>,
    prompt: &str,
    config: &GenerationConfig,
    kind: ImageKind,
) -> Vec<WorkingImage> {
    produced
        .into_iter()
        .map(|image| {
            WorkingImage::new(image.data, prompt, config.clone(), kind).with_continuation(image.continuation)
        })
        .collect()
}

/// Owned state of one studio session.
pub struct Studio<G: ?Sized, C: ?Sized> {
    gallery: Arc<G>,
    client: Arc<C>,
    upscaler: Option<Arc<dyn UpscaleClient>>,
    flattener: Box<dyn MaskFlattener>,
    session: Session,
    editor: EditorContext,
    /// Conversation carried across edits and generations.
    turns: Vec<Turn>,
    in_flight: Slots,
    /// Parameters for the next request.
    settings: GenerationConfig,
    config: StudioConfig,
}

impl<G, C> Studio<G, C>
where
    G: Gallery + ?Sized + 'static,
    C: GenerationClient + ?Sized + 'static,
{
    /// Fails with `InvalidParameter` when `config` does not validate.
    pub fn new(
        gallery: Arc<G>,
        client: Arc<C>,
        flattener: Box<dyn MaskFlattener>,
        config: StudioConfig,
        viewport_size: Size,
    ) -> StudioResult<Self> {
        let editor = EditorContext::new(&config, viewport_size)?;
        let settings = GenerationConfig {
            aspect_ratio: config.generation.aspect_ratio,
            resolution: config.generation.resolution,
            ..GenerationConfig::default()
        };
        Ok(Self {
            gallery,
            client,
            upscaler: None,
            flattener,
            session: Session::new(),
            editor,
            turns: Vec::new(),
            in_flight: Slots::default(),
            settings,
            config,
        })
    }

    /// Attach the upscaling collaborator.
    pub fn with_upscaler(mut self, upscaler: Arc<dyn UpscaleClient>) -> Self {
        self.upscaler = Some(upscaler);
        self
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn editor(&self) -> &EditorContext {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut EditorContext {
        &mut self.editor
    }

    pub fn active_image(&self) -> Option<&WorkingImage> {
        self.session.active()
    }

    pub fn settings(&self) -> &GenerationConfig {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut GenerationConfig {
        &mut self.settings
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_in_flight(&self, key: &SubmissionKey) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    /// Append images, activate the first of them and start persisting them.
    ///
    /// The session keeps the images even if the returned write fails.
    pub fn add_images(&mut self, images: Vec<WorkingImage>) -> Persistence {
        if self.session.add_images(images.clone()).is_some() {
            self.editor.unload_image();
        }
        self.persist(images)
    }

    fn persist(&self, images: Vec<WorkingImage>) -> Persistence {
        let gallery = Arc::clone(&self.gallery);
        Box::pin(async move {
            if images.is_empty() {
                return Ok(());
            }
            gallery.save_artifacts(&images).await.map_err(|e| {
                log::error!("Failed to persist {} image(s): {}", images.len(), e);
                StudioError::from(e)
            })
        })
    }

    /// Make the image at `index` active. Any change of selection drops the
    /// strokes, history and view of the previous image.
    pub fn select_active(&mut self, index: usize) -> StudioResult<()> {
        if self.session.select_active(index)? {
            self.editor.unload_image();
        }
        Ok(())
    }

    /// Step to the previous image. Returns false at the start.
    pub fn select_prev(&mut self) -> StudioResult<bool> {
        match self.session.prev_index() {
            Some(index) => self.select_active(index).map(|_| true),
            None => Ok(false),
        }
    }

    /// Step to the next image. Returns false at the end.
    pub fn select_next(&mut self) -> StudioResult<bool> {
        match self.session.next_index() {
            Some(index) => self.select_active(index).map(|_| true),
            None => Ok(false),
        }
    }

    /// Remove an image locally and request its deletion from the gallery.
    pub fn remove_image(&mut self, id: &str) -> Persistence {
        let was_active = self.session.active().is_some_and(|image| image.id == id);
        if self.session.remove_image(id).is_some() && was_active {
            self.editor.unload_image();
        }

        let gallery = Arc::clone(&self.gallery);
        let id = id.to_string();
        Box::pin(async move {
            gallery.delete_artifact(&id).await.map_err(|e| {
                log::error!("Failed to delete {} from gallery: {}", id, e);
                StudioError::from(e)
            })
        })
    }

    /// Empty the session. The gallery is untouched.
    pub fn clear(&mut self) {
        self.session.clear();
        self.turns.clear();
        self.editor.unload_image();
    }

    /// Validate and add a user-supplied file.
    pub fn upload(&mut self, data: Vec<u8>) -> StudioResult<Persistence> {
        let format = self.config.upload.validate(&data)?;
        log::info!("Uploading {} bytes ({})", data.len(), format.mime_type());
        let image = WorkingImage::uploaded(data, self.settings.clone());
        Ok(self.add_images(vec![image]))
    }

    /// Metadata of everything in the gallery.
    pub async fn list_gallery(&self) -> StudioResult<Vec<ArtifactMetadata>> {
        Ok(self.gallery.list_artifacts().await?)
    }

    /// Metadata of the gallery artifacts of one kind.
    pub async fn list_gallery_by_kind(&self, kind: ImageKind) -> StudioResult<Vec<ArtifactMetadata>> {
        Ok(self.gallery.list_artifacts_by_kind(kind).await?)
    }

    /// Replace the session with one artifact from the gallery.
    pub async fn open_from_gallery(&mut self, id: &str) -> StudioResult<()> {
        let image = self.gallery.load_artifact(id).await?;
        self.session.clear();
        self.session.add_images(vec![image]);
        self.editor.unload_image();
        Ok(())
    }

    /// Remove every artifact from the gallery. The session is untouched.
    pub fn clear_gallery(&self) -> Persistence {
        let gallery = Arc::clone(&self.gallery);
        Box::pin(async move {
            gallery.clear_all().await.map_err(|e| {
                log::error!("Failed to clear gallery: {}", e);
                StudioError::from(e)
            })
        })
    }

    /// Prepare an edit of the active image and claim its slot.
    ///
    /// With strokes present, the image is flattened with the marker and the
    /// instruction is wrapped to point at the marked region. Without strokes
    /// the original bytes are sent as-is.
    pub fn begin_edit(&mut self, instruction: &str) -> StudioResult<Submission> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(StudioError::InvalidParameter("edit instruction is empty".to_string()));
        }

        let image = self
            .session
            .active()
            .ok_or_else(|| StudioError::InvalidState("no active image to edit".to_string()))?;
        let slot = SlotGuard::claim(&self.in_flight, SubmissionKey::Image(image.id.clone()))?;

        let (bytes, text, masked) = if self.editor.has_mask() {
            let display_width = self.editor.display_width().ok_or(StudioError::DegenerateScale)?;
            let flattened = self
                .flattener
                .flatten(&image.data, display_width, self.editor.strokes())?;
            (flattened, masked_edit_instruction(instruction), true)
        } else {
            (image.data.clone(), instruction.to_string(), false)
        };

        let submission = Submission {
            image_id: image.id.clone(),
            instruction: instruction.to_string(),
            request: EditRequest {
                image: bytes,
                instruction: text,
                aspect_ratio: self.settings.aspect_ratio,
                resolution: self.settings.resolution,
                prior_turns: limit_turns(&self.turns, self.config.generation.max_prior_turns),
                masked,
            },
            slot,
        };
        log::debug!("Edit of {} claimed (masked: {})", submission.image_id, masked);
        Ok(submission)
    }

    /// The collaborator call for `submission`. Does not borrow the studio.
    pub fn dispatch(&self, submission: &Submission) -> BoxFuture<'static, GenerationResult<GenerationResponse>> {
        let client = Arc::clone(&self.client);
        let request = submission.request.clone();
        Box::pin(async move { client.submit_edit(request).await })
    }

    /// Fold an edit result back into the session and release the slot.
    ///
    /// Failures leave the strokes in place. Results for an image that is no
    /// longer active are appended without changing the selection.
    pub fn complete_edit(
        &mut self,
        submission: Submission,
        result: GenerationResult<GenerationResponse>,
    ) -> StudioResult<EditOutcome> {
        let response = match result {
            Ok(response) if !response.images.is_empty() => response,
            Ok(_) => return Err(self.edit_failed(&submission, GenerationError::EmptyResponse)),
            Err(e) => return Err(self.edit_failed(&submission, e)),
        };

        // Late results leave the current conversation alone
        if self.is_active(&submission.image_id) {
            self.turns = response.turns;
        }
        let config = GenerationConfig {
            prompt: submission.instruction.clone(),
            ..self.settings.clone()
        };
        let images = produced_images(response.images, &submission.instruction, &config, ImageKind::Edited);
        Ok(self.fold_results(&submission.image_id, images))
    }

    fn is_active(&self, id: &str) -> bool {
        self.session.active().is_some_and(|image| image.id == id)
    }

    /// Add results derived from `source_id`. They become active only if the
    /// source still is.
    fn fold_results(&mut self, source_id: &str, images: Vec<WorkingImage>) -> EditOutcome {
        let added: Vec<String> = images.iter().map(|image| image.id.clone()).collect();
        let still_active = self.is_active(source_id);

        let persistence = if still_active {
            self.add_images(images)
        } else {
            log::info!(
                "Work on {} finished after selection moved; appending {} image(s)",
                source_id,
                added.len()
            );
            self.session.append_images(images.clone());
            self.persist(images)
        };

        EditOutcome {
            added,
            activated: still_active,
            persistence,
        }
    }

    fn edit_failed(&self, submission: &Submission, error: GenerationError) -> StudioError {
        log::error!("Edit of {} failed: {}", submission.image_id, error);
        StudioError::from(error)
    }

    /// Release a submission's slot without a result.
    pub fn abandon(&mut self, submission: Submission) {
        log::debug!("Edit of {} abandoned", submission.image_id);
    }

    /// Claim, dispatch and complete an edit in one go.
    ///
    /// Holds the studio for the whole call; interactive callers use
    /// [`Studio::begin_edit`] and [`Studio::complete_edit`] instead.
    pub async fn submit_edit(&mut self, instruction: &str) -> StudioResult<EditOutcome> {
        let submission = self.begin_edit(instruction)?;
        let result = self.dispatch(&submission).await;
        self.complete_edit(submission, result)
    }

    /// Prepare an upscale of the active image, claiming its slot.
    pub fn begin_upscale(&mut self, factor: UpscaleFactor, model: UpscaleModel) -> StudioResult<UpscaleSubmission> {
        let image = self
            .session
            .active()
            .ok_or_else(|| StudioError::InvalidState("no active image to upscale".to_string()))?;
        if self.upscaler.is_none() {
            return Err(GenerationError::NotConfigured("upscaler".to_string()).into());
        }
        let slot = SlotGuard::claim(&self.in_flight, SubmissionKey::Image(image.id.clone()))?;

        log::debug!(
            "Upscale of {} claimed (x{}, {})",
            image.id,
            factor.factor(),
            model.resolve(factor)
        );
        Ok(UpscaleSubmission {
            image_id: image.id.clone(),
            prompt: image.prompt.clone(),
            config: image.config.clone(),
            request: UpscaleRequest {
                image: image.data.clone(),
                factor,
                model,
            },
            slot,
        })
    }

    /// The upscaler call for `submission`. Does not borrow the studio.
    pub fn dispatch_upscale(&self, submission: &UpscaleSubmission) -> BoxFuture<'static, GenerationResult<Vec<u8>>> {
        let upscaler = self.upscaler.clone();
        let request = submission.request.clone();
        Box::pin(async move {
            match upscaler {
                Some(upscaler) => upscaler.submit_upscale(request).await,
                None => Err(GenerationError::NotConfigured("upscaler".to_string())),
            }
        })
    }

    /// Add the upscaled image and release the slot. The conversation is
    /// left alone.
    pub fn complete_upscale(
        &mut self,
        submission: UpscaleSubmission,
        result: GenerationResult<Vec<u8>>,
    ) -> StudioResult<EditOutcome> {
        let data = match result {
            Ok(data) if !data.is_empty() => data,
            Ok(_) => return Err(self.upscale_failed(&submission, GenerationError::EmptyResponse)),
            Err(e) => return Err(self.upscale_failed(&submission, e)),
        };

        let image = WorkingImage::new(
            data,
            submission.prompt.clone(),
            submission.config.clone(),
            ImageKind::Upscaled,
        );
        Ok(self.fold_results(&submission.image_id, vec![image]))
    }

    fn upscale_failed(&self, submission: &UpscaleSubmission, error: GenerationError) -> StudioError {
        log::error!("Upscale of {} failed: {}", submission.image_id, error);
        StudioError::from(error)
    }

    /// Claim, dispatch and complete an upscale in one go.
    pub async fn upscale(&mut self, factor: UpscaleFactor, model: UpscaleModel) -> StudioResult<EditOutcome> {
        let submission = self.begin_upscale(factor, model)?;
        let result = self.dispatch_upscale(&submission).await;
        self.complete_upscale(submission, result)
    }

    /// Reachability of the upscaler.
    pub fn upscaler_health(&self) -> BoxFuture<'static, GenerationResult<()>> {
        let upscaler = self.upscaler.clone();
        Box::pin(async move {
            match upscaler {
                Some(upscaler) => upscaler.health().await,
                None => Err(GenerationError::NotConfigured("upscaler".to_string())),
            }
        })
    }

    /// Prepare a batch of `count` prompt-only generations.
    pub fn begin_generate(&mut self, prompt: &str, count: usize) -> StudioResult<BatchJob<C>> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(StudioError::InvalidParameter("prompt is empty".to_string()));
        }
        if count == 0 {
            return Err(StudioError::InvalidParameter("batch size must be at least 1".to_string()));
        }
        let slot = SlotGuard::claim(&self.in_flight, SubmissionKey::Generate)?;

        Ok(BatchJob {
            client: Arc::clone(&self.client),
            prompt: prompt.to_string(),
            config: GenerationConfig {
                prompt: prompt.to_string(),
                count: count as u32,
                ..self.settings.clone()
            },
            count,
            turns: self.turns.clone(),
            max_prior_turns: self.config.generation.max_prior_turns,
            slot,
        })
    }

    /// Add what a batch produced with a single session update.
    pub fn complete_generate(&mut self, output: BatchOutput) -> GenerateOutcome {
        let BatchOutput {
            turns,
            images,
            failures,
            slot,
        } = output;
        drop(slot);
        self.turns = turns;

        let added: Vec<String> = images.iter().map(|image| image.id.clone()).collect();
        let persistence = if images.is_empty() {
            None
        } else {
            Some(self.add_images(images))
        };

        log::info!(
            "Generation batch finished: {} image(s), {} failure(s)",
            added.len(),
            failures.len()
        );
        GenerateOutcome {
            added,
            failures,
            persistence,
        }
    }

    /// Release the generation slot without adding anything.
    pub fn abandon_generate(&mut self, job: BatchJob<C>) {
        drop(job);
        log::debug!("Generation batch abandoned");
    }

    /// Claim, run and complete a generation batch in one go.
    pub async fn generate(&mut self, prompt: &str, count: usize) -> StudioResult<GenerateOutcome> {
        let job = self.begin_generate(prompt, count)?;
        let output = job.run().await;
        Ok(self.complete_generate(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::{MemoryGallery, StorageError, StorageResult};
    use crate::generation::{ContinuationToken, ProducedImage, TurnPart};
    use crate::input::{Modifiers, MouseButton, PointerEvent};
    use crate::recorder::ToolKind;
    use crate::error::RemoteFailure;
    use kurbo::Point;
    use pollster::block_on;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::task::{Context, Poll, Waker};

    const PNG: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    /// Replies from a script, falling back to one produced image per call.
    #[derive(Default)]
    struct ScriptedClient {
        script: Mutex<VecDeque<GenerationResult<GenerationResponse>>>,
        edits: Mutex<Vec<EditRequest>>,
        generates: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedClient {
        fn with_script(script: Vec<GenerationResult<GenerationResponse>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                ..Self::default()
            }
        }

        fn reply(&self, prior: &[Turn]) -> GenerationResult<GenerationResponse> {
            if let Some(scripted) = self.script.lock().unwrap().pop_front() {
                return scripted;
            }
            Ok(success(prior))
        }
    }

    fn success(prior: &[Turn]) -> GenerationResponse {
        let mut turns = prior.to_vec();
        turns.push(Turn::user_text("request"));
        turns.push(Turn {
            role: crate::generation::Role::Model,
            parts: vec![TurnPart::Text("done".to_string())],
            continuation: Some(ContinuationToken::new(format!("sig-{}", turns.len()))),
        });
        GenerationResponse {
            images: vec![ProducedImage {
                data: PNG.to_vec(),
                continuation: Some(ContinuationToken::new("sig")),
            }],
            turns,
        }
    }

    impl GenerationClient for ScriptedClient {
        fn submit_edit(&self, request: EditRequest) -> BoxFuture<'_, GenerationResult<GenerationResponse>> {
            let reply = self.reply(&request.prior_turns);
            self.edits.lock().unwrap().push(request);
            Box::pin(async move { reply })
        }

        fn submit_generate(&self, request: GenerateRequest) -> BoxFuture<'_, GenerationResult<GenerationResponse>> {
            let reply = self.reply(&request.prior_turns);
            self.generates.lock().unwrap().push(request);
            Box::pin(async move { reply })
        }
    }

    struct BrokenGallery;

    impl Gallery for BrokenGallery {
        fn list_artifacts(&self) -> BoxFuture<'_, StorageResult<Vec<ArtifactMetadata>>> {
            Box::pin(async { Err(StorageError::Io("offline".to_string())) })
        }

        fn save_artifacts<'a>(&'a self, _images: &'a [WorkingImage]) -> BoxFuture<'a, StorageResult<()>> {
            Box::pin(async { Err(StorageError::Io("offline".to_string())) })
        }

        fn delete_artifact<'a>(&'a self, _id: &'a str) -> BoxFuture<'a, StorageResult<()>> {
            Box::pin(async { Err(StorageError::Io("offline".to_string())) })
        }

        fn clear_all(&self) -> BoxFuture<'_, StorageResult<()>> {
            Box::pin(async { Err(StorageError::Io("offline".to_string())) })
        }

        fn load_artifact<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StorageResult<WorkingImage>> {
            Box::pin(async move { Err(StorageError::NotFound(id.to_string())) })
        }
    }

    /// Records the display width it was called with.
    #[derive(Default, Clone)]
    struct RecordingFlattener {
        calls: Arc<Mutex<Vec<(f64, usize)>>>,
    }

    impl MaskFlattener for RecordingFlattener {
        fn flatten(&self, _source: &[u8], display_width: f64, strokes: &StrokeLog) -> StudioResult<Vec<u8>> {
            self.calls.lock().unwrap().push((display_width, strokes.len()));
            Ok(b"flattened".to_vec())
        }
    }

    fn studio_with<G: Gallery + 'static>(
        gallery: Arc<G>,
        client: Arc<ScriptedClient>,
    ) -> (Studio<G, ScriptedClient>, RecordingFlattener) {
        let flattener = RecordingFlattener::default();
        let studio = Studio::new(
            gallery,
            client,
            Box::new(flattener.clone()),
            StudioConfig::default(),
            Size::new(800.0, 600.0),
        )
        .unwrap();
        (studio, flattener)
    }

    fn studio() -> (Studio<MemoryGallery, ScriptedClient>, Arc<MemoryGallery>, Arc<ScriptedClient>) {
        let gallery = Arc::new(MemoryGallery::new());
        let client = Arc::new(ScriptedClient::default());
        let (studio, _) = studio_with(Arc::clone(&gallery), Arc::clone(&client));
        (studio, gallery, client)
    }

    fn image(prompt: &str) -> WorkingImage {
        WorkingImage::new(PNG.to_vec(), prompt, GenerationConfig::new(prompt), ImageKind::Generated)
    }

    fn scribble<G: ?Sized, C: ?Sized>(studio: &mut Studio<G, C>)
    where
        G: Gallery + 'static,
        C: GenerationClient + 'static,
    {
        let editor = studio.editor_mut();
        editor.load_image(Size::new(500.0, 500.0)).unwrap();
        editor.set_tool(ToolKind::Brush);
        editor
            .handle_pointer_event(PointerEvent::Down {
                position: Point::new(300.0, 300.0),
                button: MouseButton::Left,
                modifiers: Modifiers::NONE,
            })
            .unwrap();
        editor
            .handle_pointer_event(PointerEvent::Move {
                position: Point::new(320.0, 310.0),
            })
            .unwrap();
        editor
            .handle_pointer_event(PointerEvent::Up {
                position: Point::new(320.0, 310.0),
                button: MouseButton::Left,
            })
            .unwrap();
        assert!(studio.editor().has_mask());
    }

    #[test]
    fn test_add_images_persists() {
        let (mut studio, gallery, _) = studio();
        block_on(studio.add_images(vec![image("a"), image("b")])).unwrap();
        assert_eq!(studio.session().len(), 2);
        assert_eq!(studio.session().active_index(), Some(0));
        assert_eq!(gallery.len(), 2);
    }

    #[test]
    fn test_add_images_survives_gallery_failure() {
        let client = Arc::new(ScriptedClient::default());
        let (mut studio, _) = studio_with(Arc::new(BrokenGallery), client);

        let result = block_on(studio.add_images(vec![image("a")]));
        assert!(matches!(
            result,
            Err(StudioError::RemoteFailure(RemoteFailure::Gallery(StorageError::Io(_))))
        ));
        assert_eq!(studio.session().len(), 1);
        assert_eq!(studio.active_image().map(|i| i.prompt.as_str()), Some("a"));
    }

    #[test]
    fn test_selection_change_resets_editor() {
        let (mut studio, _, _) = studio();
        block_on(studio.add_images(vec![image("a"), image("b")])).unwrap();
        scribble(&mut studio);

        studio.select_active(1).unwrap();
        assert!(studio.editor().strokes().is_empty());
        assert!(!studio.editor().can_undo());
        assert!(studio.editor().image_size().is_none());
        assert!((studio.editor().viewport().scale() - 1.0).abs() < f64::EPSILON);

        assert!(matches!(
            studio.select_active(5),
            Err(StudioError::OutOfRange { index: 5, len: 2 })
        ));
        assert_eq!(studio.session().active_index(), Some(1));
    }

    #[test]
    fn test_reselecting_same_image_keeps_strokes() {
        let (mut studio, _, _) = studio();
        block_on(studio.add_images(vec![image("a")])).unwrap();
        scribble(&mut studio);
        studio.select_active(0).unwrap();
        assert!(studio.editor().has_mask());
    }

    #[test]
    fn test_prev_next_navigation() {
        let (mut studio, _, _) = studio();
        block_on(studio.add_images(vec![image("a"), image("b")])).unwrap();
        assert!(!studio.select_prev().unwrap());
        assert!(studio.select_next().unwrap());
        assert_eq!(studio.session().active_index(), Some(1));
        assert!(!studio.select_next().unwrap());
    }

    #[test]
    fn test_remove_image_adjusts_and_deletes() {
        let (mut studio, gallery, _) = studio();
        let images = vec![image("a"), image("b"), image("c")];
        let ids: Vec<String> = images.iter().map(|i| i.id.clone()).collect();
        block_on(studio.add_images(images)).unwrap();
        studio.select_active(1).unwrap();
        scribble(&mut studio);

        block_on(studio.remove_image(&ids[0])).unwrap();
        assert_eq!(studio.session().active_index(), Some(0));
        assert_eq!(studio.active_image().map(|i| i.id.as_str()), Some(ids[1].as_str()));
        assert!(studio.editor().has_mask());
        assert_eq!(gallery.len(), 2);

        block_on(studio.remove_image(&ids[1])).unwrap();
        assert!(studio.active_image().is_none());
        assert!(!studio.editor().has_mask());
    }

    #[test]
    fn test_clear_keeps_gallery() {
        let (mut studio, gallery, _) = studio();
        block_on(studio.add_images(vec![image("a")])).unwrap();
        studio.clear();
        assert!(studio.session().is_empty());
        assert_eq!(gallery.len(), 1);
    }

    #[test]
    fn test_upload_validation() {
        let (mut studio, gallery, _) = studio();
        assert!(matches!(
            studio.upload(b"plain text".to_vec()),
            Err(StudioError::Upload(crate::artifact::UploadError::UnsupportedFormat))
        ));
        assert!(studio.session().is_empty());

        block_on(studio.upload(PNG.to_vec()).unwrap()).unwrap();
        let active = studio.active_image().unwrap();
        assert_eq!(active.prompt, crate::artifact::UPLOAD_PROMPT);
        assert_eq!(active.kind, ImageKind::Generated);
        assert_eq!(gallery.len(), 1);
    }

    #[test]
    fn test_open_from_gallery_replaces_session() {
        let (mut studio, gallery, _) = studio();
        let stored = image("stored");
        block_on(gallery.save_artifacts(std::slice::from_ref(&stored))).unwrap();
        block_on(studio.add_images(vec![image("a"), image("b")])).unwrap();

        block_on(studio.open_from_gallery(&stored.id)).unwrap();
        assert_eq!(studio.session().len(), 1);
        assert_eq!(studio.active_image(), Some(&stored));

        assert!(matches!(
            block_on(studio.open_from_gallery("missing")),
            Err(StudioError::RemoteFailure(RemoteFailure::Gallery(StorageError::NotFound(_))))
        ));
    }

    #[test]
    fn test_edit_without_mask_sends_original() {
        let (mut studio, _, client) = studio();
        block_on(studio.add_images(vec![image("a")])).unwrap();

        let outcome = block_on(studio.submit_edit("make it night")).unwrap();
        block_on(outcome.persistence).unwrap();
        assert!(outcome.activated);

        let edits = client.edits.lock().unwrap();
        assert_eq!(edits[0].image, PNG.to_vec());
        assert_eq!(edits[0].instruction, "make it night");
        assert!(!edits[0].masked);

        let active = studio.active_image().unwrap();
        assert_eq!(active.kind, ImageKind::Edited);
        assert_eq!(active.prompt, "make it night");
        assert_eq!(active.continuation, Some(ContinuationToken::new("sig")));
        assert_eq!(studio.session().len(), 2);
        assert_eq!(studio.turns().len(), 2);
    }

    #[test]
    fn test_masked_edit_flattens_and_clears_strokes() {
        let gallery = Arc::new(MemoryGallery::new());
        let client = Arc::new(ScriptedClient::default());
        let (mut studio, flattener) = studio_with(gallery, Arc::clone(&client));
        block_on(studio.add_images(vec![image("a")])).unwrap();
        scribble(&mut studio);

        let outcome = block_on(studio.submit_edit("add a moon")).unwrap();
        assert_eq!(outcome.added.len(), 1);

        assert_eq!(*flattener.calls.lock().unwrap(), vec![(500.0, 1)]);
        let edits = client.edits.lock().unwrap();
        assert_eq!(edits[0].image, b"flattened".to_vec());
        assert!(edits[0].masked);
        assert!(edits[0].instruction.contains("marked in red"));
        assert!(edits[0].instruction.contains("add a moon"));

        assert!(!studio.editor().has_mask());
        assert!(!studio.editor().can_undo());
    }

    #[test]
    fn test_single_flight() {
        let (mut studio, _, _) = studio();
        block_on(studio.add_images(vec![image("a")])).unwrap();

        let first = studio.begin_edit("one").unwrap();
        assert!(studio.is_in_flight(&first.key()));
        assert!(matches!(
            studio.begin_edit("two"),
            Err(StudioError::OperationInProgress(_))
        ));

        let result = block_on(studio.dispatch(&first));
        let outcome = studio.complete_edit(first, result).unwrap();
        assert_eq!(outcome.added.len(), 1);

        // Slot is free again; the new active image has its own slot anyway
        studio.select_active(0).unwrap();
        let again = studio.begin_edit("three").unwrap();
        studio.abandon(again);
        assert!(studio.begin_edit("four").is_ok());
    }

    #[test]
    fn test_result_after_selection_moved_is_appended() {
        let (mut studio, gallery, _) = studio();
        let images = vec![image("a"), image("b")];
        let b_id = images[1].id.clone();
        block_on(studio.add_images(images)).unwrap();

        let submission = studio.begin_edit("recolor").unwrap();
        studio.select_active(1).unwrap();
        scribble(&mut studio);
        let turns_before = studio.turns().to_vec();

        let result = block_on(studio.dispatch(&submission));
        let outcome = studio.complete_edit(submission, result).unwrap();
        block_on(outcome.persistence).unwrap();

        assert!(!outcome.activated);
        assert_eq!(studio.turns(), turns_before.as_slice());
        assert_eq!(studio.session().images()[2].kind, ImageKind::Edited);
        assert_eq!(studio.session().len(), 3);
        assert_eq!(studio.active_image().map(|i| i.id.as_str()), Some(b_id.as_str()));
        assert!(studio.editor().has_mask());
        assert_eq!(gallery.len(), 3);
    }

    #[test]
    fn test_failed_edit_keeps_strokes() {
        let gallery = Arc::new(MemoryGallery::new());
        let client = Arc::new(ScriptedClient::with_script(vec![Err(GenerationError::Request(
            "quota exceeded".to_string(),
        ))]));
        let (mut studio, _) = studio_with(gallery, client);
        block_on(studio.add_images(vec![image("a")])).unwrap();
        scribble(&mut studio);

        let err = block_on(studio.submit_edit("add a moon")).err().unwrap();
        assert!(err.to_string().contains("quota exceeded"));
        assert!(matches!(
            err,
            StudioError::RemoteFailure(RemoteFailure::Generation(GenerationError::Request(_)))
        ));
        assert!(studio.editor().has_mask());
        assert_eq!(studio.session().len(), 1);
        assert!(studio.begin_edit("retry").is_ok());
    }

    #[test]
    fn test_empty_response_is_failure() {
        let gallery = Arc::new(MemoryGallery::new());
        let client = Arc::new(ScriptedClient::with_script(vec![Ok(GenerationResponse::default())]));
        let (mut studio, _) = studio_with(gallery, client);
        block_on(studio.add_images(vec![image("a")])).unwrap();

        assert!(matches!(
            block_on(studio.submit_edit("anything")),
            Err(StudioError::RemoteFailure(RemoteFailure::Generation(
                GenerationError::EmptyResponse
            )))
        ));
    }

    #[test]
    fn test_edit_preconditions() {
        let (mut studio, _, _) = studio();
        assert!(matches!(studio.begin_edit("x"), Err(StudioError::InvalidState(_))));
        block_on(studio.add_images(vec![image("a")])).unwrap();
        assert!(matches!(studio.begin_edit("   "), Err(StudioError::InvalidParameter(_))));
    }

    #[test]
    fn test_prior_turns_are_limited() {
        let (mut studio, _, client) = studio();
        block_on(studio.add_images(vec![image("a")])).unwrap();
        for _ in 0..7 {
            let outcome = block_on(studio.submit_edit("again")).unwrap();
            block_on(outcome.persistence).unwrap();
        }
        let edits = client.edits.lock().unwrap();
        assert!(edits.iter().all(|edit| edit.prior_turns.len() <= 10));
        assert_eq!(edits.last().map(|e| e.prior_turns.len()), Some(10));
    }

    #[test]
    fn test_generate_batch_isolates_failures() {
        let gallery = Arc::new(MemoryGallery::new());
        let client = Arc::new(ScriptedClient::with_script(vec![
            Ok(success(&[])),
            Err(GenerationError::Request("503".to_string())),
        ]));
        let (mut studio, _) = studio_with(Arc::clone(&gallery), Arc::clone(&client));

        let outcome = block_on(studio.generate("cat, hat", 3)).unwrap();
        assert_eq!(outcome.added.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, 1);
        block_on(outcome.persistence.unwrap()).unwrap();

        assert_eq!(studio.session().len(), 2);
        assert_eq!(studio.session().active_index(), Some(0));
        assert_eq!(gallery.len(), 2);

        // Turns from item 0 are threaded through the failure into item 2
        let requests = client.generates.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].prior_turns.len(), 0);
        assert_eq!(requests[1].prior_turns.len(), 2);
        assert_eq!(requests[2].prior_turns.len(), 2);
        assert!(requests[0].prompt.starts_with("Create an image with the following characteristics"));
        assert_eq!(requests[0].config.count, 3);
        assert_eq!(studio.turns().len(), 4);
        assert!(!studio.is_in_flight(&SubmissionKey::Generate));
    }

    #[test]
    fn test_generate_all_failed_adds_nothing() {
        let gallery = Arc::new(MemoryGallery::new());
        let client = Arc::new(ScriptedClient::with_script(vec![
            Err(GenerationError::Request("a".to_string())),
            Err(GenerationError::Request("b".to_string())),
        ]));
        let (mut studio, _) = studio_with(gallery, client);

        let outcome = block_on(studio.generate("a lighthouse", 2)).unwrap();
        assert!(outcome.added.is_empty());
        assert_eq!(outcome.failures.len(), 2);
        assert!(outcome.persistence.is_none());
        assert!(studio.session().is_empty());
    }

    #[test]
    fn test_generate_single_flight_and_validation() {
        let (mut studio, _, _) = studio();
        assert!(matches!(studio.begin_generate("x", 0), Err(StudioError::InvalidParameter(_))));
        assert!(matches!(studio.begin_generate("", 1), Err(StudioError::InvalidParameter(_))));

        let job = studio.begin_generate("x", 1).unwrap();
        assert!(matches!(
            studio.begin_generate("y", 1),
            Err(StudioError::OperationInProgress(_))
        ));
        studio.abandon_generate(job);
        assert!(studio.begin_generate("y", 1).is_ok());
    }

    #[test]
    fn test_late_result_does_not_replace_conversation() {
        let (mut studio, _, _) = studio();
        block_on(studio.add_images(vec![image("a"), image("b")])).unwrap();
        let outcome = block_on(studio.submit_edit("first")).unwrap();
        block_on(outcome.persistence).unwrap();
        let turns_of_first = studio.turns().to_vec();
        assert_eq!(turns_of_first.len(), 2);

        studio.select_active(0).unwrap();
        let submission = studio.begin_edit("second").unwrap();
        studio.select_active(1).unwrap();
        let result = block_on(studio.dispatch(&submission));
        let outcome = studio.complete_edit(submission, result).unwrap();

        assert!(!outcome.activated);
        assert_eq!(studio.turns(), turns_of_first.as_slice());
    }

    #[test]
    fn test_dropped_submission_frees_slot() {
        let (mut studio, _, _) = studio();
        block_on(studio.add_images(vec![image("a")])).unwrap();

        let submission = studio.begin_edit("one").unwrap();
        let key = submission.key();
        assert!(studio.is_in_flight(&key));
        drop(submission);
        assert!(!studio.is_in_flight(&key));
        assert!(studio.begin_edit("two").is_ok());
    }

    #[test]
    fn test_failed_flatten_frees_slot() {
        struct FailingFlattener;

        impl MaskFlattener for FailingFlattener {
            fn flatten(&self, _source: &[u8], _display_width: f64, _strokes: &StrokeLog) -> StudioResult<Vec<u8>> {
                Err(StudioError::MissingSourceImage)
            }
        }

        let mut studio = Studio::new(
            Arc::new(MemoryGallery::new()),
            Arc::new(ScriptedClient::default()),
            Box::new(FailingFlattener),
            StudioConfig::default(),
            Size::new(800.0, 600.0),
        )
        .unwrap();
        block_on(studio.add_images(vec![image("a")])).unwrap();
        let key = SubmissionKey::Image(studio.active_image().unwrap().id.clone());
        scribble(&mut studio);

        assert!(studio.begin_edit("one").is_err());
        assert!(!studio.is_in_flight(&key));
    }

    #[test]
    fn test_dropped_batch_frees_slot() {
        let (mut studio, _, _) = studio();

        let job = studio.begin_generate("a fox", 1).unwrap();
        drop(job);
        assert!(!studio.is_in_flight(&SubmissionKey::Generate));

        let job = studio.begin_generate("a fox", 1).unwrap();
        let output = block_on(job.run());
        assert!(studio.is_in_flight(&SubmissionKey::Generate));
        drop(output);
        assert!(!studio.is_in_flight(&SubmissionKey::Generate));
        assert!(studio.session().is_empty());
        assert!(studio.begin_generate("a fox", 1).is_ok());
    }

    /// Never settles.
    struct PendingClient;

    impl GenerationClient for PendingClient {
        fn submit_edit(&self, _request: EditRequest) -> BoxFuture<'_, GenerationResult<GenerationResponse>> {
            Box::pin(std::future::pending())
        }

        fn submit_generate(&self, _request: GenerateRequest) -> BoxFuture<'_, GenerationResult<GenerationResponse>> {
            Box::pin(std::future::pending())
        }
    }

    #[test]
    fn test_cancelled_edit_frees_slot() {
        let mut studio = Studio::new(
            Arc::new(MemoryGallery::new()),
            Arc::new(PendingClient),
            Box::new(RecordingFlattener::default()),
            StudioConfig::default(),
            Size::new(800.0, 600.0),
        )
        .unwrap();
        block_on(studio.add_images(vec![image("a")])).unwrap();
        let key = SubmissionKey::Image(studio.active_image().unwrap().id.clone());

        {
            let mut edit = Box::pin(studio.submit_edit("night"));
            let mut cx = Context::from_waker(Waker::noop());
            assert!(matches!(edit.as_mut().poll(&mut cx), Poll::Pending));
        }
        assert!(!studio.is_in_flight(&key));
        assert!(studio.begin_edit("again").is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = StudioConfig::default();
        config.viewport.min_scale = 20.0;
        let result = Studio::new(
            Arc::new(MemoryGallery::new()),
            Arc::new(ScriptedClient::default()),
            Box::new(RecordingFlattener::default()),
            config,
            Size::new(800.0, 600.0),
        );
        assert!(matches!(result, Err(StudioError::InvalidParameter(_))));
    }

    /// Returns fixed bytes and records requests.
    #[derive(Default)]
    struct FakeUpscaler {
        requests: Mutex<Vec<UpscaleRequest>>,
        reply: Vec<u8>,
    }

    impl UpscaleClient for FakeUpscaler {
        fn submit_upscale(&self, request: UpscaleRequest) -> BoxFuture<'_, GenerationResult<Vec<u8>>> {
            self.requests.lock().unwrap().push(request);
            let reply = self.reply.clone();
            Box::pin(async move { Ok(reply) })
        }

        fn health(&self) -> BoxFuture<'_, GenerationResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn upscaling_studio(reply: Vec<u8>) -> (Studio<MemoryGallery, ScriptedClient>, Arc<MemoryGallery>, Arc<FakeUpscaler>) {
        let (studio, gallery, _) = studio();
        let upscaler = Arc::new(FakeUpscaler {
            reply,
            ..FakeUpscaler::default()
        });
        let studio = studio.with_upscaler(upscaler.clone());
        (studio, gallery, upscaler)
    }

    #[test]
    fn test_upscale_adds_upscaled_image() {
        let (mut studio, gallery, upscaler) = upscaling_studio(b"bigger".to_vec());
        let source = image("a harbor");
        block_on(studio.add_images(vec![source.clone()])).unwrap();

        let outcome = block_on(studio.upscale(UpscaleFactor::X2, UpscaleModel::Anime)).unwrap();
        block_on(outcome.persistence).unwrap();
        assert!(outcome.activated);

        let requests = upscaler.requests.lock().unwrap();
        assert_eq!(requests[0].image, source.data);
        assert_eq!(requests[0].factor, UpscaleFactor::X2);
        assert_eq!(requests[0].model, UpscaleModel::Anime);

        let active = studio.active_image().unwrap();
        assert_eq!(active.kind, ImageKind::Upscaled);
        assert_eq!(active.data, b"bigger".to_vec());
        assert_eq!(active.prompt, "a harbor");
        assert_eq!(active.config, source.config);
        assert_eq!(studio.session().len(), 2);
        assert_eq!(gallery.len(), 2);
        assert!(studio.turns().is_empty());

        let upscaled = block_on(studio.list_gallery_by_kind(ImageKind::Upscaled)).unwrap();
        assert_eq!(upscaled.len(), 1);
        assert_eq!(upscaled[0].id, active.id);
        assert_eq!(block_on(studio.list_gallery_by_kind(ImageKind::Edited)).unwrap().len(), 0);
    }

    #[test]
    fn test_upscale_preconditions() {
        let (mut plain, _, _) = studio();
        block_on(plain.add_images(vec![image("a")])).unwrap();
        assert!(matches!(
            plain.begin_upscale(UpscaleFactor::X4, UpscaleModel::General),
            Err(StudioError::RemoteFailure(RemoteFailure::Generation(
                GenerationError::NotConfigured(_)
            )))
        ));
        assert!(block_on(plain.upscaler_health()).is_err());

        let (mut studio, _, _) = upscaling_studio(Vec::new());
        assert!(matches!(
            studio.begin_upscale(UpscaleFactor::X4, UpscaleModel::General),
            Err(StudioError::InvalidState(_))
        ));
        assert!(block_on(studio.upscaler_health()).is_ok());

        block_on(studio.add_images(vec![image("a")])).unwrap();
        assert!(matches!(
            block_on(studio.upscale(UpscaleFactor::X4, UpscaleModel::General)),
            Err(StudioError::RemoteFailure(RemoteFailure::Generation(
                GenerationError::EmptyResponse
            )))
        ));
        assert_eq!(studio.session().len(), 1);
    }

    #[test]
    fn test_upscale_shares_image_slot() {
        let (mut studio, _, _) = upscaling_studio(b"bigger".to_vec());
        block_on(studio.add_images(vec![image("a")])).unwrap();

        let edit = studio.begin_edit("recolor").unwrap();
        assert!(matches!(
            studio.begin_upscale(UpscaleFactor::X4, UpscaleModel::General),
            Err(StudioError::OperationInProgress(_))
        ));
        drop(edit);

        let upscale = studio.begin_upscale(UpscaleFactor::X4, UpscaleModel::General).unwrap();
        assert!(matches!(studio.begin_edit("recolor"), Err(StudioError::OperationInProgress(_))));
        let result = block_on(studio.dispatch_upscale(&upscale));
        let outcome = studio.complete_upscale(upscale, result).unwrap();
        assert_eq!(outcome.added.len(), 1);
    }
}
