//! Estimate store
//!
//! The single owner of all mutable project state: calibration, the
//! per-page annotation map, the label catalog, and the markup percent.
//! Every mutating operation validates its input first, applies the change
//! atomically, then synchronously rebuilds the whole cost report exactly
//! once before returning. External collaborators (rendering, export, UI)
//! only read derived snapshots; they never touch the maps directly.
//!
//! Recompute is deliberately not incremental: the pipeline is linear in
//! the number of annotations and bounded by realistic drawing sizes, and
//! rebuilding wholesale keeps the report a pure function of current state.

use std::collections::HashMap;

use crate::annotation::{
    Annotation, AnnotationId, AnnotationShape, CanvasPoint, CanvasSize, Color, NormalizedPoint,
};
use crate::calibration::CalibrationData;
use crate::cost::CostReport;
use crate::error::{ValidationError, ValidationResult};
use crate::geometry;
use crate::label::{LabelCatalog, LabelDefinition, LabelId};

/// Partial update for an existing annotation
///
/// Unset fields are left unchanged. `label_id` is doubly optional so a
/// patch can distinguish "leave the reference alone" from "clear it".
#[derive(Debug, Clone, Default)]
pub struct AnnotationPatch {
    pub position: Option<NormalizedPoint>,
    pub color: Option<Color>,
    pub label_id: Option<Option<LabelId>>,
    /// Replacement text for marker and label shapes; ignored for geometry
    pub text: Option<String>,
}

/// Service object owning the calibration → geometry → cost pipeline
#[derive(Debug)]
pub struct EstimateStore {
    calibration: CalibrationData,
    annotations: HashMap<AnnotationId, Annotation>,
    by_page: HashMap<u16, Vec<AnnotationId>>,
    labels: LabelCatalog,
    markup_percent: f32,
    /// Transient UI selection, not part of the durable model
    selected: Option<AnnotationId>,
    report: CostReport,
}

impl EstimateStore {
    /// Create an empty, uncalibrated store
    pub fn new() -> Self {
        Self {
            calibration: CalibrationData::default(),
            annotations: HashMap::new(),
            by_page: HashMap::new(),
            labels: LabelCatalog::new(),
            markup_percent: 0.0,
            selected: None,
            report: CostReport::empty(0.0),
        }
    }

    // --- calibration ---------------------------------------------------

    /// Calibrate from a reference measurement and recompute
    ///
    /// Invalid input fails with a `ValidationError` and leaves the
    /// previous calibration untouched.
    pub fn calibrate(
        &mut self,
        reference_length: f32,
        pixel_distance: f32,
    ) -> ValidationResult<&CostReport> {
        self.calibration = CalibrationData::compute(reference_length, pixel_distance)?;
        log::debug!(
            "calibrated: {} m over {} px",
            reference_length,
            pixel_distance
        );
        Ok(self.recompute())
    }

    /// Drop calibration and recompute (the report collapses to empty)
    pub fn reset_calibration(&mut self) -> &CostReport {
        self.calibration = CalibrationData::reset();
        log::debug!("calibration reset");
        self.recompute()
    }

    // --- annotation creation at the pixel boundary ---------------------

    /// Place a point marker from a raw canvas position
    pub fn add_marker(
        &mut self,
        page_number: u16,
        point: CanvasPoint,
        canvas: CanvasSize,
        color: Color,
        text: impl Into<String>,
    ) -> ValidationResult<AnnotationId> {
        let position = NormalizedPoint::from_canvas(point, canvas);
        let shape = AnnotationShape::Marker { text: text.into() };
        self.insert(Annotation::new(page_number, position, color, shape))
    }

    /// Place a free-text label from a raw canvas position
    pub fn add_text_label(
        &mut self,
        page_number: u16,
        point: CanvasPoint,
        canvas: CanvasSize,
        color: Color,
        text: impl Into<String>,
    ) -> ValidationResult<AnnotationId> {
        let position = NormalizedPoint::from_canvas(point, canvas);
        let shape = AnnotationShape::Label { text: text.into() };
        self.insert(Annotation::new(page_number, position, color, shape))
    }

    /// Place a line from raw canvas endpoints
    ///
    /// The pixel length is captured here, before normalization discards
    /// the canvas dimensions.
    pub fn add_line(
        &mut self,
        page_number: u16,
        start: CanvasPoint,
        end: CanvasPoint,
        canvas: CanvasSize,
        color: Color,
    ) -> ValidationResult<AnnotationId> {
        let length_px = geometry::distance(start, end);
        let start_norm = NormalizedPoint::from_canvas(start, canvas);
        let end_norm = NormalizedPoint::from_canvas(end, canvas);
        let position = NormalizedPoint::new(
            (start_norm.x + end_norm.x) / 2.0,
            (start_norm.y + end_norm.y) / 2.0,
        );
        let shape = AnnotationShape::Line {
            start: start_norm,
            end: end_norm,
            length_px,
        };
        self.insert(Annotation::new(page_number, position, color, shape))
    }

    /// Place a polygon from raw canvas vertices
    ///
    /// The shoelace area is captured in pixel space at this boundary.
    pub fn add_polygon(
        &mut self,
        page_number: u16,
        vertices: &[CanvasPoint],
        canvas: CanvasSize,
        color: Color,
    ) -> ValidationResult<AnnotationId> {
        let area_px = geometry::polygon_area(vertices);
        let normalized: Vec<NormalizedPoint> = vertices
            .iter()
            .map(|v| NormalizedPoint::from_canvas(*v, canvas))
            .collect();
        let position = centroid(&normalized);
        let shape = AnnotationShape::Polygon {
            vertices: normalized,
            area_px,
        };
        self.insert(Annotation::new(page_number, position, color, shape))
    }

    /// Insert a pre-built annotation (used by deserialization and tests)
    pub fn insert(&mut self, annotation: Annotation) -> ValidationResult<AnnotationId> {
        annotation.validate()?;
        let id = annotation.id;
        let page_number = annotation.page_number;

        self.annotations.insert(id, annotation);
        self.by_page.entry(page_number).or_default().push(id);
        log::debug!("annotation {} added on page {}", id, page_number);
        self.recompute();
        Ok(id)
    }

    // --- annotation mutation -------------------------------------------

    /// Apply a partial update and stamp `updated_at`
    ///
    /// An unknown id is a benign no-op, not an error: it is usually a
    /// harmless race with a concurrent delete in the UI. Invalid patched
    /// state is rejected before anything is committed.
    pub fn update_annotation(
        &mut self,
        id: AnnotationId,
        patch: AnnotationPatch,
    ) -> ValidationResult<()> {
        let Some(current) = self.annotations.get(&id) else {
            log::debug!("update for unknown annotation {}, ignoring", id);
            return Ok(());
        };

        let mut updated = current.clone();
        if let Some(position) = patch.position {
            updated.position = position;
        }
        if let Some(color) = patch.color {
            updated.color = color;
        }
        if let Some(label_id) = patch.label_id {
            updated.label_id = label_id;
        }
        if let Some(new_text) = patch.text {
            match &mut updated.shape {
                AnnotationShape::Marker { text } | AnnotationShape::Label { text } => {
                    *text = new_text;
                }
                AnnotationShape::Line { .. } | AnnotationShape::Polygon { .. } => {}
            }
        }
        updated.touch();
        updated.validate()?;

        self.annotations.insert(id, updated);
        self.recompute();
        Ok(())
    }

    /// Remove an annotation; unknown ids are a benign no-op
    pub fn delete_annotation(&mut self, id: AnnotationId) {
        let Some(annotation) = self.annotations.remove(&id) else {
            log::debug!("delete for unknown annotation {}, ignoring", id);
            return;
        };
        if let Some(ids) = self.by_page.get_mut(&annotation.page_number) {
            ids.retain(|&aid| aid != id);
            if ids.is_empty() {
                self.by_page.remove(&annotation.page_number);
            }
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.recompute();
    }

    /// Clear one page's annotations
    pub fn clear_page(&mut self, page_number: u16) {
        if let Some(ids) = self.by_page.remove(&page_number) {
            for id in ids {
                self.annotations.remove(&id);
                if self.selected == Some(id) {
                    self.selected = None;
                }
            }
        }
        self.recompute();
    }

    /// Clear every page
    pub fn clear_all(&mut self) {
        self.annotations.clear();
        self.by_page.clear();
        self.selected = None;
        self.recompute();
    }

    // --- label catalog --------------------------------------------------

    /// Replace the whole catalog (order is the caller's display order)
    pub fn set_labels(&mut self, labels: Vec<LabelDefinition>) {
        self.labels.replace(labels);
        self.recompute();
    }

    /// Insert or update one label
    pub fn upsert_label(&mut self, label: LabelDefinition) {
        self.labels.upsert(label);
        self.recompute();
    }

    /// Remove a label; annotations referencing it keep their dangling
    /// reference and simply drop out of the next cost report
    pub fn remove_label(&mut self, id: LabelId) {
        self.labels.remove(id);
        self.recompute();
    }

    // --- markup and selection -------------------------------------------

    /// Set the markup percentage
    ///
    /// Negative values are rejected; anything above the UI's advisory
    /// [0, 50] range is tolerated here.
    pub fn set_markup_percent(&mut self, markup_percent: f32) -> ValidationResult<()> {
        if !markup_percent.is_finite() || markup_percent < 0.0 {
            return Err(ValidationError::NegativeMarkup(markup_percent));
        }
        self.markup_percent = markup_percent;
        self.recompute();
        Ok(())
    }

    /// Set or clear the transient selection; no recompute
    pub fn select(&mut self, id: Option<AnnotationId>) {
        self.selected = id.filter(|id| self.annotations.contains_key(id));
    }

    // --- readers --------------------------------------------------------

    /// The current derived cost report
    pub fn report(&self) -> &CostReport {
        &self.report
    }

    /// Current calibration state
    pub fn calibration(&self) -> &CalibrationData {
        &self.calibration
    }

    /// The label catalog
    pub fn labels(&self) -> &LabelCatalog {
        &self.labels
    }

    /// Look up one annotation
    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    /// All annotations for a page, in insertion order
    pub fn annotations_for_page(&self, page_number: u16) -> Vec<&Annotation> {
        self.by_page
            .get(&page_number)
            .map(|ids| ids.iter().filter_map(|id| self.annotations.get(id)).collect())
            .unwrap_or_default()
    }

    /// Every annotation, unordered
    pub fn all_annotations(&self) -> Vec<&Annotation> {
        self.annotations.values().collect()
    }

    /// Total annotation count
    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }

    /// Current markup percentage
    pub fn markup_percent(&self) -> f32 {
        self.markup_percent
    }

    /// The transient selection
    pub fn selected_annotation(&self) -> Option<AnnotationId> {
        self.selected
    }

    // --- pipeline -------------------------------------------------------

    /// Rebuild the whole cost report from current state
    ///
    /// Called exactly once at the end of every mutating operation.
    fn recompute(&mut self) -> &CostReport {
        let annotations: Vec<&Annotation> = self.annotations.values().collect();
        self.report = CostReport::build(
            &annotations,
            &self.labels,
            &self.calibration,
            self.markup_percent,
        );
        &self.report
    }

    /// Rebuild internal state from deserialized parts
    ///
    /// Used by the persistence layer; persisted cost items are treated as
    /// a regenerable cache and never trusted. Annotations that fail the
    /// store's boundary invariants (a hand-edited sidecar can carry
    /// out-of-range coordinates or short polygons) are dropped with a
    /// warning rather than admitted silently.
    pub(crate) fn from_parts(
        calibration: CalibrationData,
        annotations: Vec<Annotation>,
        labels: LabelCatalog,
        markup_percent: f32,
    ) -> Self {
        let mut store = Self::new();
        store.calibration = calibration;
        store.labels = labels;
        store.labels.rebuild_index();
        store.markup_percent = markup_percent.max(0.0);
        for annotation in annotations {
            if let Err(error) = annotation.validate() {
                log::warn!(
                    "dropping invalid annotation {} from snapshot: {}",
                    annotation.id,
                    error
                );
                continue;
            }
            let id = annotation.id;
            store
                .by_page
                .entry(annotation.page_number)
                .or_default()
                .push(id);
            store.annotations.insert(id, annotation);
        }
        store.recompute();
        store
    }
}

impl Default for EstimateStore {
    fn default() -> Self {
        Self::new()
    }
}

fn centroid(points: &[NormalizedPoint]) -> NormalizedPoint {
    if points.is_empty() {
        return NormalizedPoint::new(0.0, 0.0);
    }
    let n = points.len() as f32;
    let sum_x: f32 = points.iter().map(|p| p.x).sum();
    let sum_y: f32 = points.iter().map(|p| p.y).sum();
    NormalizedPoint::new(sum_x / n, sum_y / n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::MeasureUnit;

    const CANVAS: CanvasSize = CanvasSize { width: 1000.0, height: 1000.0 };

    fn square_label(cost: f32) -> LabelDefinition {
        LabelDefinition::new("Slab", MeasureUnit::SquareMeters)
            .with_cost(cost)
            .with_category("Concrete")
    }

    #[test]
    fn test_end_to_end_square_meter_estimate() {
        let mut store = EstimateStore::new();
        store.calibrate(5.0, 100.0).unwrap();

        let label = square_label(50.0);
        let label_id = label.id;
        store.set_labels(vec![label]);

        // 100x100 px square, 10,000 px²
        let square = [
            CanvasPoint::new(100.0, 100.0),
            CanvasPoint::new(200.0, 100.0),
            CanvasPoint::new(200.0, 200.0),
            CanvasPoint::new(100.0, 200.0),
        ];
        let id = store.add_polygon(1, &square, CANVAS, Color::BLUE).unwrap();
        store
            .update_annotation(id, AnnotationPatch { label_id: Some(Some(label_id)), ..Default::default() })
            .unwrap();

        let report = store.report();
        assert_eq!(report.items.len(), 1);
        assert!((report.items[0].quantity - 25.0).abs() < 1e-3);
        assert!((report.grand_total - 1250.0).abs() < 1e-2);
        assert!((report.category_totals["Concrete"].percentage - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_reset_calibration_empties_report() {
        let mut store = EstimateStore::new();
        store.calibrate(5.0, 100.0).unwrap();

        let label = square_label(50.0);
        let label_id = label.id;
        store.set_labels(vec![label]);

        let square = [
            CanvasPoint::new(0.0, 0.0),
            CanvasPoint::new(100.0, 0.0),
            CanvasPoint::new(100.0, 100.0),
            CanvasPoint::new(0.0, 100.0),
        ];
        let id = store.add_polygon(1, &square, CANVAS, Color::BLUE).unwrap();
        store
            .update_annotation(id, AnnotationPatch { label_id: Some(Some(label_id)), ..Default::default() })
            .unwrap();
        assert!(!store.report().items.is_empty());

        let report = store.reset_calibration();
        assert!(report.items.is_empty());
        assert!(report.category_totals.values().all(|t| t.percentage == 0.0));
        // The annotation itself survives
        assert_eq!(store.annotation_count(), 1);
    }

    #[test]
    fn test_failed_calibration_preserves_state() {
        let mut store = EstimateStore::new();
        store.calibrate(5.0, 100.0).unwrap();
        let before = *store.calibration();

        assert!(store.calibrate(-1.0, 100.0).is_err());
        assert_eq!(store.calibration(), &before);

        assert!(store.calibrate(5.0, 0.2).is_err());
        assert_eq!(store.calibration(), &before);
    }

    #[test]
    fn test_add_rejects_out_of_canvas_points() {
        let mut store = EstimateStore::new();
        // A point past the canvas edge normalizes outside [0, 1]
        let result = store.add_marker(
            1,
            CanvasPoint::new(1500.0, 200.0),
            CANVAS,
            Color::RED,
            "bad",
        );
        assert!(result.is_err());
        assert_eq!(store.annotation_count(), 0);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut store = EstimateStore::new();
        let result = store.update_annotation(AnnotationId::new_v4(), AnnotationPatch::default());
        assert!(result.is_ok());
        assert_eq!(store.annotation_count(), 0);
    }

    #[test]
    fn test_delete_clears_selection() {
        let mut store = EstimateStore::new();
        let id = store
            .add_marker(1, CanvasPoint::new(10.0, 10.0), CANVAS, Color::RED, "m")
            .unwrap();
        store.select(Some(id));
        assert_eq!(store.selected_annotation(), Some(id));

        store.delete_annotation(id);
        assert_eq!(store.selected_annotation(), None);
        assert_eq!(store.annotation_count(), 0);

        // Double delete is benign
        store.delete_annotation(id);
    }

    #[test]
    fn test_clear_page_is_scoped() {
        let mut store = EstimateStore::new();
        store
            .add_marker(1, CanvasPoint::new(10.0, 10.0), CANVAS, Color::RED, "a")
            .unwrap();
        store
            .add_marker(1, CanvasPoint::new(20.0, 20.0), CANVAS, Color::RED, "b")
            .unwrap();
        store
            .add_marker(2, CanvasPoint::new(30.0, 30.0), CANVAS, Color::RED, "c")
            .unwrap();

        store.clear_page(1);
        assert_eq!(store.annotation_count(), 1);
        assert_eq!(store.annotations_for_page(1).len(), 0);
        assert_eq!(store.annotations_for_page(2).len(), 1);

        store.clear_all();
        assert_eq!(store.annotation_count(), 0);
    }

    #[test]
    fn test_label_deletion_orphans_but_keeps_annotation() {
        let mut store = EstimateStore::new();
        store.calibrate(5.0, 100.0).unwrap();

        let label = LabelDefinition::new("Outlet", MeasureUnit::Count).with_cost(10.0);
        let label_id = label.id;
        store.upsert_label(label);

        let id = store
            .add_marker(1, CanvasPoint::new(10.0, 10.0), CANVAS, Color::RED, "")
            .unwrap();
        store
            .update_annotation(id, AnnotationPatch { label_id: Some(Some(label_id)), ..Default::default() })
            .unwrap();
        assert_eq!(store.report().items.len(), 1);

        store.remove_label(label_id);
        // Annotation survives with its dangling reference; the report
        // simply omits it
        assert_eq!(store.annotation_count(), 1);
        assert_eq!(store.annotation(id).unwrap().label_id, Some(label_id));
        assert!(store.report().items.is_empty());
    }

    #[test]
    fn test_line_annotation_linear_pricing() {
        let mut store = EstimateStore::new();
        store.calibrate(5.0, 100.0).unwrap();

        let label = LabelDefinition::new("Wall", MeasureUnit::LinearMeters)
            .with_cost(80.0)
            .with_category("Framing");
        let label_id = label.id;
        store.upsert_label(label);

        // 200 px line at 0.05 m/px -> 10 m -> 800
        let id = store
            .add_line(
                1,
                CanvasPoint::new(100.0, 100.0),
                CanvasPoint::new(300.0, 100.0),
                CANVAS,
                Color::GREEN,
            )
            .unwrap();
        store
            .update_annotation(id, AnnotationPatch { label_id: Some(Some(label_id)), ..Default::default() })
            .unwrap();

        let report = store.report();
        assert!((report.items[0].quantity - 10.0).abs() < 1e-3);
        assert!((report.grand_total - 800.0).abs() < 1e-2);
    }

    #[test]
    fn test_markup_applied_to_report() {
        let mut store = EstimateStore::new();
        store.calibrate(5.0, 100.0).unwrap();

        let label = LabelDefinition::new("Outlet", MeasureUnit::Count).with_cost(500.0);
        let label_id = label.id;
        store.upsert_label(label);

        for point in [CanvasPoint::new(10.0, 10.0), CanvasPoint::new(20.0, 20.0)] {
            let id = store.add_marker(1, point, CANVAS, Color::RED, "").unwrap();
            store
                .update_annotation(
                    id,
                    AnnotationPatch { label_id: Some(Some(label_id)), ..Default::default() },
                )
                .unwrap();
        }

        store.set_markup_percent(10.0).unwrap();
        let report = store.report();
        assert!((report.grand_total - 1000.0).abs() < 1e-2);
        assert!((report.markup_amount - 100.0).abs() < 1e-2);
        assert!((report.total_with_markup - 1100.0).abs() < 1e-2);

        assert!(store.set_markup_percent(-5.0).is_err());
        assert!((store.markup_percent() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_update_text_and_position() {
        let mut store = EstimateStore::new();
        let id = store
            .add_marker(1, CanvasPoint::new(10.0, 10.0), CANVAS, Color::RED, "old")
            .unwrap();

        store
            .update_annotation(
                id,
                AnnotationPatch {
                    position: Some(NormalizedPoint::new(0.25, 0.75)),
                    text: Some("new".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let annotation = store.annotation(id).unwrap();
        assert!((annotation.position.x - 0.25).abs() < 1e-6);
        match &annotation.shape {
            AnnotationShape::Marker { text } => assert_eq!(text, "new"),
            other => panic!("unexpected shape {:?}", other),
        }

        // An invalid position is rejected without committing anything
        let result = store.update_annotation(
            id,
            AnnotationPatch {
                position: Some(NormalizedPoint::new(2.0, 0.5)),
                ..Default::default()
            },
        );
        assert!(result.is_err());
        let annotation = store.annotation(id).unwrap();
        assert!((annotation.position.x - 0.25).abs() < 1e-6);
    }
}
