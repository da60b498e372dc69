//! Error types for the takeoff core
//!
//! Validation failures are rejected at the boundary before any state is
//! mutated. Unknown-id updates and deletes are benign no-ops, not errors,
//! since they commonly arise from harmless UI races.

/// Error type for input validation at the store boundary
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Calibration reference length must be strictly positive
    #[error("reference length must be > 0, got {0}")]
    InvalidReferenceLength(f32),

    /// Calibration pixel distance must be at least one pixel
    #[error("pixel distance must be >= {min} px, got {got}")]
    InvalidPixelDistance { got: f32, min: f32 },

    /// Normalized coordinates must stay within [0, 1]
    #[error("normalized coordinate ({x}, {y}) outside [0, 1]")]
    CoordinateOutOfRange { x: f32, y: f32 },

    /// Polygons need at least three vertices
    #[error("polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    /// Page numbers are 1-based
    #[error("page number must be >= 1")]
    InvalidPageNumber,

    /// Markup percentage cannot be negative
    #[error("markup percent must be >= 0, got {0}")]
    NegativeMarkup(f32),
}

/// Result type for validating store operations
pub type ValidationResult<T> = Result<T, ValidationError>;
