//! Label catalog
//!
//! Labels give annotations their cost semantics: a unit of measure, an
//! optional unit cost, and a category for rollups. Many annotations may
//! reference the same label; deleting a label only orphans those
//! references, it never cascades into the annotations themselves.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::annotation::Color;

/// Unique identifier for a label definition
pub type LabelId = uuid::Uuid;

/// Unit of measure a label assigns to its annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureUnit {
    /// One per annotation, regardless of geometry
    Count,
    /// Line length times the linear scale factor
    LinearMeters,
    /// Polygon area times the squared scale factor
    SquareMeters,
}

impl MeasureUnit {
    /// Short display suffix (e.g., "m²")
    pub fn suffix(&self) -> &'static str {
        match self {
            MeasureUnit::Count => "ea",
            MeasureUnit::LinearMeters => "m",
            MeasureUnit::SquareMeters => "m²",
        }
    }
}

/// A named, colored, unit-typed, priced category definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelDefinition {
    /// Stable unique identifier
    pub id: LabelId,

    /// Display name (e.g., "Exterior wall")
    pub name: String,

    /// Rollup category; None lands in the "Uncategorized" bucket
    pub category: Option<String>,

    /// Display color
    pub color: Color,

    /// Icon name for the toolbar
    pub icon: String,

    /// Unit of measure applied to referencing annotations
    pub unit: MeasureUnit,

    /// Cost per unit; unpriced labels contribute no cost items
    pub cost_per_unit: Option<f32>,

    /// Optional free-text description
    pub description: Option<String>,
}

impl LabelDefinition {
    /// Create a new label with a generated ID
    pub fn new(name: impl Into<String>, unit: MeasureUnit) -> Self {
        Self {
            id: LabelId::new_v4(),
            name: name.into(),
            category: None,
            color: Color::BLACK,
            icon: String::new(),
            unit,
            cost_per_unit: None,
            description: None,
        }
    }

    /// Set the rollup category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the unit cost
    pub fn with_cost(mut self, cost_per_unit: f32) -> Self {
        self.cost_per_unit = Some(cost_per_unit);
        self
    }

    /// Set the display color
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

/// Externally-managed, ordered list of label definitions
///
/// The catalog keeps the caller's ordering for display while serving
/// id lookups for the aggregation join.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelCatalog {
    labels: Vec<LabelDefinition>,
    #[serde(skip)]
    index: HashMap<LabelId, usize>,
}

impl LabelCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole catalog, preserving the given order
    pub fn replace(&mut self, labels: Vec<LabelDefinition>) {
        self.labels = labels;
        self.rebuild_index();
    }

    /// Insert or update a label; inserts keep catalog order
    pub fn upsert(&mut self, label: LabelDefinition) {
        match self.index.get(&label.id) {
            Some(&position) => self.labels[position] = label,
            None => {
                self.index.insert(label.id, self.labels.len());
                self.labels.push(label);
            }
        }
    }

    /// Remove a label; referencing annotations are left orphaned
    pub fn remove(&mut self, id: LabelId) -> Option<LabelDefinition> {
        let position = self.index.remove(&id)?;
        let removed = self.labels.remove(position);
        self.rebuild_index();
        Some(removed)
    }

    /// Look up a label by id
    pub fn get(&self, id: LabelId) -> Option<&LabelDefinition> {
        self.index.get(&id).map(|&position| &self.labels[position])
    }

    /// All labels in catalog order
    pub fn all(&self) -> &[LabelDefinition] {
        &self.labels
    }

    /// Number of labels in the catalog
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rebuild the id index after a bulk change or deserialization
    ///
    /// The index is skipped by serde, so loaded catalogs must call this.
    pub fn rebuild_index(&mut self) {
        self.index = self
            .labels
            .iter()
            .enumerate()
            .map(|(position, label)| (label.id, position))
            .collect();
    }
}
