//! Cost aggregation
//!
//! Joins annotations to their labels, derives calibrated quantities, and
//! rolls everything up into an itemized report with category totals and a
//! markup surcharge. The report is entirely derived state: it is rebuilt
//! wholesale from annotations + labels + calibration on every upstream
//! mutation, so it can never drift from the ground truth.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::annotation::{Annotation, AnnotationId, AnnotationShape};
use crate::calibration::CalibrationData;
use crate::geometry::{derive_quantity, sanitize};
use crate::label::{LabelCatalog, MeasureUnit};

/// Category bucket for labels without one
pub const UNCATEGORIZED: &str = "Uncategorized";

/// One priced line of the estimate, derived from a single annotation
///
/// Never hand-edited; regenerated from scratch on every recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostItem {
    /// Id of the annotation this item was derived from
    pub id: AnnotationId,

    /// Label name
    pub description: String,

    /// Calibrated quantity in the label's unit
    pub quantity: f32,

    /// Unit of measure
    pub unit: MeasureUnit,

    /// Cost per unit from the label
    pub unit_cost: f32,

    /// quantity * unit_cost
    pub total_cost: f32,

    /// Rollup category
    pub category: String,

    /// Page the source annotation sits on (1-based)
    pub page_number: u16,

    /// Free text carried over from marker/label annotations
    pub notes: Option<String>,
}

/// Aggregated cost, item count, and share of the grand total for one category
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub cost: f32,
    pub count: usize,
    /// 100 * category cost / grand total; 0 when the grand total is 0
    pub percentage: f32,
}

/// Markup surcharge applied on top of the grand total
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkupSummary {
    pub markup_amount: f32,
    pub total_with_markup: f32,
}

/// Build cost items for every annotation with a resolvable priced label
///
/// Annotations without a label, with a dangling label reference, or whose
/// label has no unit cost contribute nothing — they are absent from the
/// output entirely, not present as zero-cost rows. An uncalibrated
/// project short-circuits to an empty result: cost figures must never be
/// shown against an uncalibrated scale.
pub fn aggregate(
    annotations: &[&Annotation],
    labels: &LabelCatalog,
    calibration: &CalibrationData,
) -> Vec<CostItem> {
    if !calibration.is_calibrated {
        return Vec::new();
    }

    // Deterministic report order regardless of map iteration: page,
    // then creation time, with the id as a tiebreaker
    let mut ordered: Vec<&Annotation> = annotations.to_vec();
    ordered.sort_by_key(|a| (a.page_number, a.created_at, a.id));

    ordered
        .iter()
        .filter_map(|annotation| {
            let label = labels.get(annotation.label_id?)?;
            let unit_cost = label.cost_per_unit?;

            let quantity = derive_quantity(&annotation.shape, label.unit, calibration);
            let notes = match &annotation.shape {
                AnnotationShape::Marker { text } | AnnotationShape::Label { text }
                    if !text.is_empty() =>
                {
                    Some(text.clone())
                }
                _ => None,
            };

            Some(CostItem {
                id: annotation.id,
                description: label.name.clone(),
                quantity,
                unit: label.unit,
                unit_cost,
                total_cost: sanitize(quantity * unit_cost),
                category: label
                    .category
                    .clone()
                    .unwrap_or_else(|| UNCATEGORIZED.to_string()),
                page_number: annotation.page_number,
                notes,
            })
        })
        .collect()
}

/// Group items by category and compute cost, count, and percentage
///
/// Percentages sum to 100 (within floating-point tolerance) whenever the
/// grand total is positive, and are all 0 when it is 0.
pub fn category_totals(items: &[CostItem]) -> BTreeMap<String, CategoryTotals> {
    let grand_total: f32 = items.iter().map(|item| item.total_cost).sum();

    let mut totals: BTreeMap<String, CategoryTotals> = BTreeMap::new();
    for item in items {
        let entry = totals.entry(item.category.clone()).or_default();
        entry.cost += item.total_cost;
        entry.count += 1;
    }

    for entry in totals.values_mut() {
        entry.percentage = if grand_total > 0.0 {
            100.0 * entry.cost / grand_total
        } else {
            0.0
        };
    }

    totals
}

/// Apply a markup percentage to the grand total
///
/// Tolerates any non-negative percent; the [0, 50] clamp belongs to the
/// UI caller, not the aggregator.
pub fn with_markup(grand_total: f32, markup_percent: f32) -> MarkupSummary {
    let markup_amount = sanitize(grand_total * markup_percent / 100.0);
    MarkupSummary {
        markup_amount,
        total_with_markup: grand_total + markup_amount,
    }
}

/// The complete cost report consumed by export, print, and UI layers
///
/// The core never produces file bytes; this structured object is the
/// whole output contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub items: Vec<CostItem>,
    pub category_totals: BTreeMap<String, CategoryTotals>,
    pub grand_total: f32,
    pub markup_percent: f32,
    pub markup_amount: f32,
    pub total_with_markup: f32,
}

impl CostReport {
    /// Build a full report from current state
    pub fn build(
        annotations: &[&Annotation],
        labels: &LabelCatalog,
        calibration: &CalibrationData,
        markup_percent: f32,
    ) -> Self {
        let items = aggregate(annotations, labels, calibration);
        let category_totals = category_totals(&items);
        let grand_total: f32 = items.iter().map(|item| item.total_cost).sum();
        let markup = with_markup(grand_total, markup_percent);

        Self {
            items,
            category_totals,
            grand_total,
            markup_percent,
            markup_amount: markup.markup_amount,
            total_with_markup: markup.total_with_markup,
        }
    }

    /// An empty report with the given markup percent
    pub fn empty(markup_percent: f32) -> Self {
        Self {
            items: Vec::new(),
            category_totals: BTreeMap::new(),
            grand_total: 0.0,
            markup_percent,
            markup_amount: 0.0,
            total_with_markup: 0.0,
        }
    }
}
