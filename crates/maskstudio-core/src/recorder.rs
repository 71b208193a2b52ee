//! Tool kinds and the stroke recorder.

use crate::error::{StudioError, StudioResult};
use crate::stroke::{Stroke, StrokeTool};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Select,
    Brush,
    Eraser,
}

impl ToolKind {
    /// Stroke kind this tool draws, `None` for tools that never draw.
    pub fn stroke_tool(self) -> Option<StrokeTool> {
        match self {
            ToolKind::Select => None,
            ToolKind::Brush => Some(StrokeTool::Paint),
            ToolKind::Eraser => Some(StrokeTool::Erase),
        }
    }

    pub fn draws(self) -> bool {
        self.stroke_tool().is_some()
    }
}

/// Stroke being drawn between pointer-down and pointer-up.
#[derive(Debug, Clone)]
struct OpenStroke {
    tool: StrokeTool,
    width: f64,
    points: Vec<Point>,
}

/// Turns pointer samples (already in content space) into strokes.
#[derive(Debug, Clone, Default)]
pub struct StrokeRecorder {
    open: Option<OpenStroke>,
}

impl StrokeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a stroke anchored at `start`.
    pub fn begin_stroke(&mut self, tool: ToolKind, width: f64, start: Point) -> StudioResult<()> {
        if self.open.is_some() {
            return Err(StudioError::InvalidState("a stroke is already open".to_string()));
        }
        let Some(stroke_tool) = tool.stroke_tool() else {
            return Err(StudioError::InvalidState(format!("{tool:?} tool does not draw")));
        };
        if width <= 0.0 || !width.is_finite() {
            return Err(StudioError::InvalidParameter(format!(
                "stroke width must be positive, got {width}"
            )));
        }

        self.open = Some(OpenStroke {
            tool: stroke_tool,
            width,
            points: vec![start],
        });
        Ok(())
    }

    /// Append a sample to the open stroke. No-op when nothing is open.
    pub fn extend_stroke(&mut self, point: Point) {
        if let Some(open) = &mut self.open {
            open.points.push(point);
        }
    }

    /// Close the open stroke.
    ///
    /// Returns the sealed stroke when at least one sample followed the
    /// anchor; otherwise the stroke is dropped. The recorder is idle
    /// afterwards in every case.
    pub fn end_stroke(&mut self) -> Option<Stroke> {
        let open = self.open.take()?;
        if open.points.len() < 2 {
            log::debug!("discarding stroke without samples");
            return None;
        }
        Some(Stroke::from_points(open.tool, open.width, open.points))
    }

    /// Drop the open stroke without committing it.
    pub fn cancel(&mut self) {
        self.open = None;
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// The stroke in progress, for live preview.
    pub fn preview(&self) -> Option<Stroke> {
        self.open
            .as_ref()
            .map(|open| Stroke::from_points(open.tool, open.width, open.points.clone()))
    }
}
