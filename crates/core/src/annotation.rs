//! Annotation data model
//!
//! Annotations are stored in a canvas-size-independent coordinate space:
//! every position is normalized to [0, 1] against the canvas dimensions
//! that were current at capture time, so annotations survive zoom and
//! window resizes. Line lengths and polygon areas are captured in pixel
//! space when the shape is drawn; calibration turns them into real-world
//! quantities downstream.

use crate::error::{ValidationError, ValidationResult};
use crate::label::LabelId;

/// Unique identifier for an annotation
///
/// Stable across the project lifetime, persists in saved snapshots.
/// Generated using UUID v4 for guaranteed uniqueness.
pub type AnnotationId = uuid::Uuid;

/// A raw pointer position in canvas pixel space
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CanvasPoint {
    pub x: f32,
    pub y: f32,
}

impl CanvasPoint {
    /// Create a new canvas point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance_to(&self, other: &CanvasPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Canvas dimensions at capture time, in pixels
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

impl CanvasSize {
    /// Create a new canvas size
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A position normalized to canvas width/height, each component in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

impl NormalizedPoint {
    /// Create a new normalized point without range checking
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Normalize a pixel position against the given canvas size
    pub fn from_canvas(point: CanvasPoint, canvas: CanvasSize) -> Self {
        Self {
            x: point.x / canvas.width,
            y: point.y / canvas.height,
        }
    }

    /// Denormalize back into pixel space for the given canvas size
    pub fn to_canvas(&self, canvas: CanvasSize) -> CanvasPoint {
        CanvasPoint::new(self.x * canvas.width, self.y * canvas.height)
    }

    /// Check that both components are within [0, 1]
    pub fn is_in_range(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }

    fn validate(&self) -> ValidationResult<()> {
        if self.is_in_range() {
            Ok(())
        } else {
            Err(ValidationError::CoordinateOutOfRange {
                x: self.x,
                y: self.y,
            })
        }
    }
}

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Format as a hex string (e.g., #FF0000)
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Common annotation colors
impl Color {
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };
    pub const YELLOW: Color = Color { r: 255, g: 255, b: 0, a: 255 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
}

/// Geometric shape of an annotation
///
/// A closed sum type: GeometryEngine and CostAggregator match on it
/// exhaustively, so adding a new kind is a compile-time-checked change.
/// Line and Polygon carry the pixel-space measure derived at capture
/// time, since the normalized vertices alone cannot reproduce it once
/// the canvas has been resized.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum AnnotationShape {
    /// Point marker with free text
    Marker { text: String },

    /// Text label pinned at a position
    Label { text: String },

    /// Line segment between two normalized endpoints
    Line {
        start: NormalizedPoint,
        end: NormalizedPoint,
        /// Length in pixels at capture time
        length_px: f32,
    },

    /// Closed polygon with at least three normalized vertices
    Polygon {
        vertices: Vec<NormalizedPoint>,
        /// Shoelace area in pixels squared at capture time
        area_px: f32,
    },
}

impl AnnotationShape {
    /// Get a short type name for display and export
    pub fn kind_name(&self) -> &'static str {
        match self {
            AnnotationShape::Marker { .. } => "Marker",
            AnnotationShape::Label { .. } => "Label",
            AnnotationShape::Line { .. } => "Line",
            AnnotationShape::Polygon { .. } => "Polygon",
        }
    }

    fn validate(&self) -> ValidationResult<()> {
        match self {
            AnnotationShape::Marker { .. } | AnnotationShape::Label { .. } => Ok(()),
            AnnotationShape::Line { start, end, .. } => {
                start.validate()?;
                end.validate()
            }
            AnnotationShape::Polygon { vertices, .. } => {
                if vertices.len() < 3 {
                    return Err(ValidationError::TooFewVertices(vertices.len()));
                }
                for vertex in vertices {
                    vertex.validate()?;
                }
                Ok(())
            }
        }
    }
}

/// A geometric annotation placed on a drawing page
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Annotation {
    /// Stable unique identifier
    pub id: AnnotationId,

    /// Page this annotation belongs to (1-based)
    pub page_number: u16,

    /// Anchor position, normalized to the capture-time canvas
    pub position: NormalizedPoint,

    /// Display color
    pub color: Color,

    /// Reference to a label definition (shared, not owned)
    pub label_id: Option<LabelId>,

    /// Geometric shape and its captured pixel measure
    pub shape: AnnotationShape,

    /// Creation timestamp (Unix seconds)
    pub created_at: i64,

    /// Last modification timestamp (Unix seconds)
    pub updated_at: i64,
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

impl Annotation {
    /// Create a new annotation with a generated ID and current timestamps
    pub fn new(
        page_number: u16,
        position: NormalizedPoint,
        color: Color,
        shape: AnnotationShape,
    ) -> Self {
        let now = unix_now();
        Self {
            id: AnnotationId::new_v4(),
            page_number,
            position,
            color,
            label_id: None,
            shape,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a label reference
    pub fn with_label(mut self, label_id: LabelId) -> Self {
        self.label_id = Some(label_id);
        self
    }

    /// Update the modification timestamp to now
    pub fn touch(&mut self) {
        self.updated_at = unix_now();
    }

    /// Validate the normalization and shape invariants
    ///
    /// Enforced at the store boundary before any mutation is applied.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.page_number < 1 {
            return Err(ValidationError::InvalidPageNumber);
        }
        if !self.position.is_in_range() {
            return Err(ValidationError::CoordinateOutOfRange {
                x: self.position.x,
                y: self.position.y,
            });
        }
        self.shape.validate()
    }

    /// Compute the canvas-space anchor where a quantity label should be
    /// drawn: line midpoint, polygon centroid, or the position itself.
    pub fn anchor(&self, canvas: CanvasSize) -> CanvasPoint {
        match &self.shape {
            AnnotationShape::Marker { .. } | AnnotationShape::Label { .. } => {
                self.position.to_canvas(canvas)
            }
            AnnotationShape::Line { start, end, .. } => {
                let mid = NormalizedPoint::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0);
                mid.to_canvas(canvas)
            }
            AnnotationShape::Polygon { vertices, .. } => {
                if vertices.is_empty() {
                    return self.position.to_canvas(canvas);
                }
                let n = vertices.len() as f32;
                let sum_x: f32 = vertices.iter().map(|v| v.x).sum();
                let sum_y: f32 = vertices.iter().map(|v| v.y).sum();
                NormalizedPoint::new(sum_x / n, sum_y / n).to_canvas(canvas)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_point_distance() {
        let p1 = CanvasPoint::new(0.0, 0.0);
        let p2 = CanvasPoint::new(3.0, 4.0);
        assert!((p1.distance_to(&p2) - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_normalize_round_trip() {
        let canvas = CanvasSize::new(1200.0, 800.0);
        let pixel = CanvasPoint::new(600.0, 200.0);

        let norm = NormalizedPoint::from_canvas(pixel, canvas);
        assert!((norm.x - 0.5).abs() < 0.001);
        assert!((norm.y - 0.25).abs() < 0.001);

        let back = norm.to_canvas(canvas);
        assert!((back.x - pixel.x).abs() < 0.001);
        assert!((back.y - pixel.y).abs() < 0.001);
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(Color::RED.to_hex(), "#FF0000");
        assert_eq!(Color::rgb(0, 255, 0).to_hex(), "#00FF00");
        assert_eq!(Color::BLACK.to_hex(), "#000000");
    }

    #[test]
    fn test_out_of_range_position_rejected() {
        let annotation = Annotation::new(
            1,
            NormalizedPoint::new(1.5, 0.5),
            Color::RED,
            AnnotationShape::Marker { text: "outlet".to_string() },
        );
        assert!(matches!(
            annotation.validate(),
            Err(ValidationError::CoordinateOutOfRange { .. })
        ));
    }

    #[test]
    fn test_polygon_vertex_count_rejected() {
        let annotation = Annotation::new(
            1,
            NormalizedPoint::new(0.5, 0.5),
            Color::BLUE,
            AnnotationShape::Polygon {
                vertices: vec![NormalizedPoint::new(0.1, 0.1), NormalizedPoint::new(0.2, 0.2)],
                area_px: 0.0,
            },
        );
        assert!(matches!(
            annotation.validate(),
            Err(ValidationError::TooFewVertices(2))
        ));
    }

    #[test]
    fn test_valid_annotation_passes() {
        let annotation = Annotation::new(
            2,
            NormalizedPoint::new(0.5, 0.5),
            Color::GREEN,
            AnnotationShape::Line {
                start: NormalizedPoint::new(0.0, 0.0),
                end: NormalizedPoint::new(1.0, 1.0),
                length_px: 100.0,
            },
        );
        assert!(annotation.validate().is_ok());
    }

    #[test]
    fn test_touch_updates_timestamp() {
        let mut annotation = Annotation::new(
            1,
            NormalizedPoint::new(0.1, 0.1),
            Color::BLACK,
            AnnotationShape::Marker { text: String::new() },
        );
        let created = annotation.created_at;
        annotation.touch();
        assert!(annotation.updated_at >= created);
    }

    #[test]
    fn test_line_anchor_is_midpoint() {
        let canvas = CanvasSize::new(100.0, 100.0);
        let annotation = Annotation::new(
            1,
            NormalizedPoint::new(0.0, 0.0),
            Color::RED,
            AnnotationShape::Line {
                start: NormalizedPoint::new(0.0, 0.0),
                end: NormalizedPoint::new(1.0, 0.5),
                length_px: 111.8,
            },
        );
        let anchor = annotation.anchor(canvas);
        assert!((anchor.x - 50.0).abs() < 0.001);
        assert!((anchor.y - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_polygon_anchor_is_centroid() {
        let canvas = CanvasSize::new(100.0, 100.0);
        let annotation = Annotation::new(
            1,
            NormalizedPoint::new(0.0, 0.0),
            Color::RED,
            AnnotationShape::Polygon {
                vertices: vec![
                    NormalizedPoint::new(0.0, 0.0),
                    NormalizedPoint::new(0.6, 0.0),
                    NormalizedPoint::new(0.6, 0.6),
                    NormalizedPoint::new(0.0, 0.6),
                ],
                area_px: 3600.0,
            },
        );
        let anchor = annotation.anchor(canvas);
        assert!((anchor.x - 30.0).abs() < 0.001);
        assert!((anchor.y - 30.0).abs() < 0.001);
    }
}
