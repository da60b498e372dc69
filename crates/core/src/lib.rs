//! Takeoff Core Library
//!
//! Calibration, annotation, and cost-estimation pipeline for scanned
//! construction drawings: calibrate a pixel scale from one reference
//! measurement, place geometric annotations in a zoom-independent
//! coordinate space, and derive an itemized, categorized cost report
//! that is rebuilt from scratch on every mutation.

pub mod annotation;
pub mod calibration;
pub mod cost;
pub mod error;
pub mod geometry;
pub mod label;
pub mod persistence;
pub mod store;

pub use annotation::{
    Annotation, AnnotationId, AnnotationShape, CanvasPoint, CanvasSize, Color, NormalizedPoint,
};
pub use calibration::{CalibrationData, MIN_PIXEL_DISTANCE};
pub use cost::{CategoryTotals, CostItem, CostReport, MarkupSummary, UNCATEGORIZED};
pub use error::{ValidationError, ValidationResult};
pub use label::{LabelCatalog, LabelDefinition, LabelId, MeasureUnit};
pub use persistence::{
    delete_snapshot, load_snapshot, save_snapshot, snapshot_exists, snapshot_path,
    PersistenceError, PersistenceResult, ProjectSnapshot,
};
pub use store::{AnnotationPatch, EstimateStore};
