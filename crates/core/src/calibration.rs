//! Drawing scale calibration
//!
//! One user-supplied reference measurement (a known real-world length and
//! the pixel distance it spans on screen) fixes the meters-per-pixel scale
//! factor. Every downstream unit conversion is gated on `is_calibrated`:
//! an uncalibrated project must never fabricate real-world quantities.

use crate::error::{ValidationError, ValidationResult};

/// Minimum accepted pixel distance for calibration
///
/// A degenerate near-zero drag would blow the scale factor up to
/// nonsense, so anything shorter than one pixel is rejected.
pub const MIN_PIXEL_DISTANCE: f32 = 1.0;

/// Scale calibration state for a drawing
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CalibrationData {
    /// Real-world length of the reference measurement, in meters
    pub reference_length: f32,

    /// Pixel distance the reference measurement spans
    pub pixel_distance: f32,

    /// Derived scale factor; meaningless unless `is_calibrated`
    pub meters_per_pixel: f32,

    /// Whether a valid calibration has been applied
    pub is_calibrated: bool,
}

impl CalibrationData {
    /// Derive a calibration from a reference measurement
    ///
    /// Fails with a `ValidationError` and leaves no state behind when the
    /// reference length is not positive or the pixel distance is below
    /// [`MIN_PIXEL_DISTANCE`].
    pub fn compute(reference_length: f32, pixel_distance: f32) -> ValidationResult<Self> {
        if !reference_length.is_finite() || reference_length <= 0.0 {
            return Err(ValidationError::InvalidReferenceLength(reference_length));
        }
        if !pixel_distance.is_finite() || pixel_distance < MIN_PIXEL_DISTANCE {
            return Err(ValidationError::InvalidPixelDistance {
                got: pixel_distance,
                min: MIN_PIXEL_DISTANCE,
            });
        }

        Ok(Self {
            reference_length,
            pixel_distance,
            meters_per_pixel: reference_length / pixel_distance,
            is_calibrated: true,
        })
    }

    /// The initial, uncalibrated state
    pub fn reset() -> Self {
        Self::default()
    }

    /// Convert a pixel distance to meters; 0 when uncalibrated
    pub fn to_meters(&self, pixels: f32) -> f32 {
        if !self.is_calibrated {
            return 0.0;
        }
        pixels * self.meters_per_pixel
    }

    /// Convert a pixel area to square meters; 0 when uncalibrated
    ///
    /// Area scales with the square of the linear factor.
    pub fn to_square_meters(&self, pixels_squared: f32) -> f32 {
        if !self.is_calibrated {
            return 0.0;
        }
        pixels_squared * self.meters_per_pixel * self.meters_per_pixel
    }
}

impl Default for CalibrationData {
    fn default() -> Self {
        Self {
            reference_length: 0.0,
            pixel_distance: 0.0,
            meters_per_pixel: 0.0,
            is_calibrated: false,
        }
    }
}
