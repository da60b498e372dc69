//! Pure geometry functions
//!
//! All functions operate on pixel-space values; scale invariance is
//! already handled by annotation normalization upstream. Outputs are
//! always finite and non-negative: NaN or negative results from
//! degenerate inputs are clamped to 0 rather than propagated, since a
//! NaN reaching the cost totals is strictly worse than under-reporting
//! a malformed annotation.

use crate::annotation::{AnnotationShape, CanvasPoint};
use crate::calibration::CalibrationData;
use crate::label::MeasureUnit;

/// Euclidean distance between two pixel-space points
pub fn distance(p1: CanvasPoint, p2: CanvasPoint) -> f32 {
    sanitize(p1.distance_to(&p2))
}

/// Area of a simple polygon by the shoelace formula, in pixels squared
///
/// Vertices are treated cyclically (the last connects back to the
/// first); traversal order does not affect the result. Fewer than three
/// vertices yield 0 by contract, never an error, since the store has
/// already enforced the vertex-count invariant at creation time.
pub fn polygon_area(vertices: &[CanvasPoint]) -> f32 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += vertices[i].x * vertices[j].y;
        sum -= vertices[j].x * vertices[i].y;
    }
    sanitize((sum / 2.0).abs())
}

/// Derive the real-world quantity for a shape under a label's unit
///
/// Uncalibrated projects yield 0 for every unit: the pipeline must not
/// fabricate a value without a scale. Count quantities are 1 per
/// annotation; linear quantities scale with `meters_per_pixel`; area
/// quantities scale with its square.
pub fn derive_quantity(
    shape: &AnnotationShape,
    unit: MeasureUnit,
    calibration: &CalibrationData,
) -> f32 {
    if !calibration.is_calibrated {
        return 0.0;
    }

    let quantity = match unit {
        MeasureUnit::Count => 1.0,
        MeasureUnit::LinearMeters => match shape {
            AnnotationShape::Line { length_px, .. } => calibration.to_meters(*length_px),
            AnnotationShape::Marker { .. }
            | AnnotationShape::Label { .. }
            | AnnotationShape::Polygon { .. } => 0.0,
        },
        MeasureUnit::SquareMeters => match shape {
            AnnotationShape::Polygon { area_px, .. } => calibration.to_square_meters(*area_px),
            AnnotationShape::Marker { .. }
            | AnnotationShape::Label { .. }
            | AnnotationShape::Line { .. } => 0.0,
        },
    };

    sanitize(quantity)
}

/// Clamp NaN, infinite, or negative values to 0
pub fn sanitize(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
