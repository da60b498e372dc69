//! Project snapshot persistence
//!
//! Saves and loads the whole project state as a JSON sidecar file next to
//! the drawing. Cost items are persisted as a display cache only: loading
//! always rebuilds the report from annotations + labels + calibration, so
//! the cache can never become a second source of truth.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::annotation::Annotation;
use crate::calibration::CalibrationData;
use crate::cost::CostItem;
use crate::label::LabelCatalog;
use crate::store::EstimateStore;

/// Error types for persistence operations
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Serialized form of a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub calibration: CalibrationData,
    pub annotations: Vec<Annotation>,
    pub labels: LabelCatalog,
    #[serde(default)]
    pub markup_percent: f32,
    /// Regenerable cache, ignored on load
    #[serde(default)]
    pub cost_items: Vec<CostItem>,
}

impl EstimateStore {
    /// Capture the current state as a serializable snapshot
    pub fn snapshot(&self) -> ProjectSnapshot {
        let mut annotations: Vec<Annotation> =
            self.all_annotations().into_iter().cloned().collect();
        annotations.sort_by_key(|a| (a.page_number, a.created_at, a.id));

        ProjectSnapshot {
            calibration: *self.calibration(),
            annotations,
            labels: self.labels().clone(),
            markup_percent: self.markup_percent(),
            cost_items: self.report().items.clone(),
        }
    }

    /// Rebuild a store from a snapshot, recomputing all derived state
    pub fn from_snapshot(snapshot: ProjectSnapshot) -> Self {
        Self::from_parts(
            snapshot.calibration,
            snapshot.annotations,
            snapshot.labels,
            snapshot.markup_percent,
        )
    }
}

/// Get the snapshot file path for a given drawing path
///
/// The snapshot is stored as a JSON sidecar file with the same name but
/// with a `.takeoff.json` extension appended.
pub fn snapshot_path(drawing_path: &Path) -> PathBuf {
    let mut path_str = drawing_path.to_string_lossy().to_string();
    path_str.push_str(".takeoff.json");
    PathBuf::from(path_str)
}

/// Save a snapshot next to the drawing
///
/// Written atomically through a temporary file and rename so a crash
/// mid-write cannot leave a truncated snapshot behind.
pub fn save_snapshot(drawing_path: &Path, snapshot: &ProjectSnapshot) -> PersistenceResult<PathBuf> {
    let path = snapshot_path(drawing_path);
    let json = serde_json::to_string_pretty(snapshot)?;

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, &path)?;

    log::debug!("snapshot saved to {}", path.display());
    Ok(path)
}

/// Load a snapshot for a drawing, or None when no sidecar exists
pub fn load_snapshot(drawing_path: &Path) -> PersistenceResult<Option<ProjectSnapshot>> {
    let path = snapshot_path(drawing_path);
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(&path)?;
    let snapshot: ProjectSnapshot = serde_json::from_str(&json)?;
    Ok(Some(snapshot))
}

/// Check if a snapshot exists for a drawing
pub fn snapshot_exists(drawing_path: &Path) -> bool {
    snapshot_path(drawing_path).exists()
}

/// Delete a drawing's snapshot file
pub fn delete_snapshot(drawing_path: &Path) -> PersistenceResult<()> {
    let path = snapshot_path(drawing_path);
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}
