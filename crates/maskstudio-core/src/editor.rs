//! Editing context for the active image.
//!
//! One `EditorContext` owns the viewport, the stroke recorder, the committed
//! stroke log and its history. Pointer events are routed through an explicit
//! interaction state machine so that every way out of a drag (button release,
//! pointer leaving the surface, focus loss) releases the open stroke.

use crate::config::{BrushConfig, StudioConfig, ViewportConfig};
use crate::error::{StudioError, StudioResult};
use crate::history::History;
use crate::input::{Modifiers, MouseButton, PointerEvent};
use crate::recorder::{StrokeRecorder, ToolKind};
use crate::stroke::{Stroke, StrokeLog};
use crate::viewport::Viewport;
use kurbo::{Point, Size, Vec2};

/// Current pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    /// A stroke is open in the recorder.
    Drawing,
    /// Dragging the viewport; `last` is the previous pointer position.
    Panning { last: Point },
}

/// Brush outline shown under the pointer, in pointer space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushCursor {
    pub center: Point,
    /// On-screen diameter (brush width times viewport scale).
    pub diameter: f64,
}

/// Owned editing state for a single active image.
#[derive(Debug, Clone)]
pub struct EditorContext {
    viewport: Viewport,
    recorder: StrokeRecorder,
    history: History,
    /// Committed strokes; always equal to the history entry under the cursor.
    strokes: StrokeLog,
    mode: InteractionMode,
    tool: ToolKind,
    brush_width: f64,
    /// Size of the image node in content units, when an image is loaded.
    image_size: Option<Size>,
    viewport_size: Size,
    /// Last known pointer position over the surface.
    pointer: Option<Point>,
    viewport_config: ViewportConfig,
    brush_config: BrushConfig,
}

impl EditorContext {
    /// Fails with `InvalidParameter` when `config` does not validate.
    pub fn new(config: &StudioConfig, viewport_size: Size) -> StudioResult<Self> {
        config.validate()?;
        Ok(Self {
            viewport: Viewport::with_config(&config.viewport),
            recorder: StrokeRecorder::new(),
            history: History::with_limit(config.history.limit),
            strokes: StrokeLog::new(),
            mode: InteractionMode::Idle,
            tool: ToolKind::default(),
            brush_width: config.brush.clamp(config.brush.default_width),
            image_size: None,
            viewport_size,
            pointer: None,
            viewport_config: config.viewport,
            brush_config: config.brush,
        })
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport_size
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport_size = size;
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    /// Switch tools. Any drag in progress is finished first.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.finish_interaction();
        self.tool = tool;
    }

    pub fn brush_width(&self) -> f64 {
        self.brush_width
    }

    /// Set the brush width, clamped to the configured range.
    pub fn set_brush_width(&mut self, width: f64) {
        self.brush_width = self.brush_config.clamp(width);
    }

    pub fn image_size(&self) -> Option<Size> {
        self.image_size
    }

    /// Width of the image as laid out in content space.
    pub fn display_width(&self) -> Option<f64> {
        self.image_size.map(|size| size.width)
    }

    /// Target a newly decoded image: clears strokes and history and fits
    /// the view.
    pub fn load_image(&mut self, display_size: Size) -> StudioResult<()> {
        if !(display_size.width > 0.0 && display_size.height > 0.0) {
            return Err(StudioError::InvalidParameter(format!(
                "image size must be positive, got {}x{}",
                display_size.width, display_size.height
            )));
        }
        self.discard_interaction();
        self.image_size = Some(display_size);
        self.clear_mask();
        self.reset_view();
        Ok(())
    }

    /// Drop the current image along with its strokes, history and view.
    pub fn unload_image(&mut self) {
        self.discard_interaction();
        self.image_size = None;
        self.clear_mask();
        self.reset_view();
    }

    /// Committed strokes.
    pub fn strokes(&self) -> &StrokeLog {
        &self.strokes
    }

    /// Committed strokes plus the one being drawn, for live rendering.
    pub fn preview_strokes(&self) -> StrokeLog {
        match self.recorder.preview() {
            Some(open) => self.strokes.with_stroke(open),
            None => self.strokes.clone(),
        }
    }

    pub fn has_mask(&self) -> bool {
        !self.strokes.is_empty()
    }

    /// Forget all strokes and history.
    pub fn clear_mask(&mut self) {
        self.strokes = StrokeLog::new();
        self.history.reset();
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Returns true if undo was performed.
    pub fn undo(&mut self) -> bool {
        self.finish_interaction();
        match self.history.undo() {
            Some(log) => {
                self.strokes = log.clone();
                true
            }
            None => false,
        }
    }

    /// Returns true if redo was performed.
    pub fn redo(&mut self) -> bool {
        self.finish_interaction();
        match self.history.redo() {
            Some(log) => {
                self.strokes = log.clone();
                true
            }
            None => false,
        }
    }

    /// Fit the loaded image, or return to identity without one.
    pub fn reset_view(&mut self) {
        self.viewport.reset_view(
            self.image_size,
            self.viewport_size,
            self.viewport_config.fit_margin,
        );
    }

    pub fn zoom(&mut self, factor: f64, anchor: Point) -> StudioResult<()> {
        self.viewport.zoom(factor, anchor)
    }

    /// Zoom in one step about the viewport center.
    pub fn zoom_in(&mut self) -> StudioResult<()> {
        self.viewport
            .zoom(self.viewport_config.zoom_in_step, self.viewport_center())
    }

    /// Zoom out one step about the viewport center.
    pub fn zoom_out(&mut self) -> StudioResult<()> {
        self.viewport
            .zoom(self.viewport_config.zoom_out_step, self.viewport_center())
    }

    fn viewport_center(&self) -> Point {
        Point::new(self.viewport_size.width / 2.0, self.viewport_size.height / 2.0)
    }

    /// Brush outline to draw under the pointer, if the tool draws.
    pub fn brush_cursor(&self) -> Option<BrushCursor> {
        if !self.tool.draws() {
            return None;
        }
        self.pointer.map(|center| BrushCursor {
            center,
            diameter: self.brush_width * self.viewport.scale(),
        })
    }

    /// Route one pointer event through the interaction state machine.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) -> StudioResult<()> {
        match event {
            PointerEvent::Down { position, .. } | PointerEvent::Move { position } => {
                self.pointer = Some(position)
            }
            PointerEvent::Leave | PointerEvent::FocusLost => self.pointer = None,
            _ => {}
        }

        match (self.mode, event) {
            (
                InteractionMode::Idle,
                PointerEvent::Down {
                    position,
                    button,
                    modifiers,
                },
            ) => self.press(position, button, modifiers)?,
            (InteractionMode::Drawing, PointerEvent::Move { position }) => {
                self.recorder.extend_stroke(self.viewport.to_content(position));
            }
            (InteractionMode::Panning { last }, PointerEvent::Move { position }) => {
                self.viewport.pan(position - last);
                self.mode = InteractionMode::Panning { last: position };
            }
            (InteractionMode::Drawing | InteractionMode::Panning { .. }, event)
                if event.ends_interaction() =>
            {
                self.finish_interaction();
            }
            (
                _,
                PointerEvent::Wheel {
                    position,
                    delta,
                    modifiers,
                },
            ) => self.wheel(position, delta, modifiers)?,
            _ => {}
        }
        Ok(())
    }

    fn press(&mut self, position: Point, button: MouseButton, modifiers: Modifiers) -> StudioResult<()> {
        let pans = button == MouseButton::Middle || (button == MouseButton::Left && modifiers.shift);
        if pans {
            self.mode = InteractionMode::Panning { last: position };
            return Ok(());
        }

        if button != MouseButton::Left || !self.tool.draws() || self.image_size.is_none() {
            return Ok(());
        }

        let start = self.viewport.to_content(position);
        self.recorder.begin_stroke(self.tool, self.brush_width, start)?;
        self.mode = InteractionMode::Drawing;
        Ok(())
    }

    fn wheel(&mut self, position: Point, delta: Vec2, modifiers: Modifiers) -> StudioResult<()> {
        if modifiers.zoom_chord() {
            let direction = if delta.y > 0.0 { -1.0 } else { 1.0 };
            let factor = 1.0 + direction * self.viewport_config.wheel_zoom_speed;
            self.viewport.zoom(factor, position)
        } else {
            self.viewport.pan(-delta);
            Ok(())
        }
    }

    /// Leave the current interaction, committing an open stroke.
    fn finish_interaction(&mut self) {
        match std::mem::take(&mut self.mode) {
            InteractionMode::Drawing => {
                if let Some(stroke) = self.recorder.end_stroke() {
                    self.commit(stroke);
                }
            }
            InteractionMode::Panning { .. } | InteractionMode::Idle => {}
        }
        self.recorder.cancel();
    }

    /// Leave the current interaction without committing anything.
    fn discard_interaction(&mut self) {
        self.mode = InteractionMode::Idle;
        self.recorder.cancel();
    }

    fn commit(&mut self, stroke: Stroke) {
        self.strokes = self.strokes.with_stroke(stroke);
        self.history.push(self.strokes.clone());
        log::debug!("committed stroke #{}", self.strokes.len());
    }
}
