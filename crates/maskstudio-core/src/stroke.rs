//! Freehand mask strokes and the append-only stroke log.

use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How a stroke composites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeTool {
    /// Marks a region to change.
    Paint,
    /// Carves through earlier strokes.
    Erase,
}

/// One continuous freehand mark in content coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub tool: StrokeTool,
    /// Points in temporal order.
    points: Vec<Point>,
    /// Line width in content units.
    pub width: f64,
}

impl Stroke {
    /// Create from existing points.
    pub fn from_points(tool: StrokeTool, width: f64, points: Vec<Point>) -> Self {
        Self {
            tool,
            points,
            width,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Get the number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether every point coincides, i.e. the stroke renders as a dot.
    pub fn is_dot(&self) -> bool {
        match self.points.first() {
            Some(first) => self
                .points
                .iter()
                .all(|p| (p.x - first.x).abs() < f64::EPSILON && (p.y - first.y).abs() < f64::EPSILON),
            None => false,
        }
    }

    /// Copy of this stroke with points and width multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            tool: self.tool,
            points: self
                .points
                .iter()
                .map(|p| Point::new(p.x * factor, p.y * factor))
                .collect(),
            width: self.width * factor,
        }
    }

    /// Bounding box of the centerline, grown by half the line width.
    pub fn bounds(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::ZERO;
        };

        let mut rect = Rect::from_points(*first, *first);
        for point in &self.points[1..] {
            rect = rect.union_pt(*point);
        }
        rect.inflate(self.width / 2.0, self.width / 2.0)
    }

    /// Polyline through the points.
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();

        if self.points.is_empty() {
            return path;
        }

        path.move_to(self.points[0]);
        for point in self.points.iter().skip(1) {
            path.line_to(*point);
        }

        path
    }
}

/// Ordered, immutable sequence of strokes.
///
/// Insertion order is paint order. Appending yields a new log that shares
/// the committed strokes with its predecessor, so snapshots held elsewhere
/// never observe later changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeLog {
    strokes: Vec<Arc<Stroke>>,
}

impl StrokeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new log with `stroke` appended on top.
    pub fn with_stroke(&self, stroke: Stroke) -> Self {
        let mut strokes = self.strokes.clone();
        strokes.push(Arc::new(stroke));
        Self { strokes }
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Strokes back to front.
    pub fn iter(&self) -> impl Iterator<Item = &Stroke> {
        self.strokes.iter().map(|s| s.as_ref())
    }

    /// Union of all stroke bounds.
    pub fn bounds(&self) -> Option<Rect> {
        self.iter()
            .map(Stroke::bounds)
            .reduce(|acc, bounds| acc.union(bounds))
    }
}

impl FromIterator<Stroke> for StrokeLog {
    fn from_iter<I: IntoIterator<Item = Stroke>>(iter: I) -> Self {
        Self {
            strokes: iter.into_iter().map(Arc::new).collect(),
        }
    }
}
