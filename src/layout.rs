//! Anchor table for the printed A4 template.
//!
//! Every drawable value has exactly one entry here, keyed by its field
//! identifier. The defaults match the current paper template; a JSON copy
//! of the table can replace them when the template is revised.

use crate::error::AppError;
use crate::form::{FormField, GroupKind};
use crate::preferences::PreferenceField;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ============================================================================
// Constants
// ============================================================================

/// A4 landscape at 300 DPI.
pub const CANVAS_WIDTH_PX: u32 = 3508;
pub const CANVAS_HEIGHT_PX: u32 = 2480;
pub const CANVAS_DPI: f32 = 300.0;

/// Text height in canvas pixels.
pub const FONT_SIZE_PX: f32 = 32.0;

/// Limits on user-supplied layout tables.
pub const MAX_CANVAS_SIDE_PX: u32 = 20_000;
pub const MAX_FONT_SIZE_PX: f32 = 1_000.0;

const FIELD_ANCHORS: [(FormField, u32, u32); 9] = [
    (FormField::RegistrationNumber, 2910, 130),
    (FormField::ModelNumber, 2910, 235),
    (FormField::TravelDistance, 2970, 2305),
    (FormField::CheckedYear, 2970, 2115),
    (FormField::CheckedMonth, 3120, 2115),
    (FormField::CheckedDay, 3230, 2115),
    (FormField::MaintainedYear, 2970, 2210),
    (FormField::MaintainedMonth, 3120, 2210),
    (FormField::MaintainedDay, 3230, 2210),
];

const PREFERENCE_ANCHORS: [(PreferenceField, u32, u32); 4] = [
    (PreferenceField::BusinessName, 1515, 2183),
    (PreferenceField::Address, 1515, 2232),
    (PreferenceField::PhoneNumber, 1515, 2282),
    (PreferenceField::CellphoneNumber, 1815, 2282),
];

const LOOKED_ITEM_ANCHORS: [(u32, u32); 9] = [
    (2800, 541),
    (2800, 597),
    (2800, 654),
    (2800, 710),
    (2800, 765),
    (2800, 820),
    (2800, 876),
    (2800, 933),
    (2800, 990),
];

const PARTS_REPLACEMENT_ANCHORS: [(u32, u32); 5] = [
    (2800, 1373),
    (2800, 1430),
    (2800, 1486),
    (2800, 1543),
    (2800, 1598),
];

// ============================================================================
// Layout Table
// ============================================================================

/// Top-left text position on the canvas, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: u32,
    pub y: u32,
}

impl From<(u32, u32)> for Anchor {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAnchor {
    pub field: FormField,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceAnchor {
    pub field: PreferenceField,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateLayout {
    pub width: u32,
    pub height: u32,
    pub font_size: f32,
    pub fields: Vec<FieldAnchor>,
    pub preferences: Vec<PreferenceAnchor>,
    pub looked_items: Vec<Anchor>,
    pub parts_replacement: Vec<Anchor>,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH_PX,
            height: CANVAS_HEIGHT_PX,
            font_size: FONT_SIZE_PX,
            fields: FIELD_ANCHORS
                .iter()
                .map(|&(field, x, y)| FieldAnchor { field, x, y })
                .collect(),
            preferences: PREFERENCE_ANCHORS
                .iter()
                .map(|&(field, x, y)| PreferenceAnchor { field, x, y })
                .collect(),
            looked_items: LOOKED_ITEM_ANCHORS.iter().copied().map(Anchor::from).collect(),
            parts_replacement: PARTS_REPLACEMENT_ANCHORS
                .iter()
                .copied()
                .map(Anchor::from)
                .collect(),
        }
    }
}

impl TemplateLayout {
    /// Read a layout table from a JSON file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Layout(format!("{}: {}", path.display(), e)))?;
        let layout: TemplateLayout = serde_json::from_str(&content)
            .map_err(|e| AppError::Layout(format!("{}: {}", path.display(), e)))?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        serde_json::to_string_pretty(self).map_err(|e| AppError::Layout(e.to_string()))
    }

    /// Reject tables that would draw nothing sensible or key a field twice.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.width == 0 || self.height == 0 {
            return Err(AppError::Layout("canvas size must be non-zero".to_string()));
        }
        if self.width > MAX_CANVAS_SIDE_PX || self.height > MAX_CANVAS_SIDE_PX {
            return Err(AppError::Layout(format!(
                "canvas {}x{} is larger than {} px per side",
                self.width, self.height, MAX_CANVAS_SIDE_PX
            )));
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0 && self.font_size <= MAX_FONT_SIZE_PX) {
            return Err(AppError::Layout(format!("bad font size {}", self.font_size)));
        }

        let mut seen = HashSet::new();
        for anchor in &self.fields {
            if !seen.insert(anchor.field) {
                return Err(AppError::Layout(format!("{} is listed twice", anchor.field)));
            }
        }
        let mut seen = HashSet::new();
        for anchor in &self.preferences {
            if !seen.insert(anchor.field) {
                return Err(AppError::Layout(format!(
                    "{} is listed twice",
                    anchor.field.label()
                )));
            }
        }
        Ok(())
    }

    pub fn field_anchor(&self, field: FormField) -> Option<Anchor> {
        self.fields
            .iter()
            .find(|a| a.field == field)
            .map(|a| Anchor { x: a.x, y: a.y })
    }

    pub fn preference_anchor(&self, field: PreferenceField) -> Option<Anchor> {
        self.preferences
            .iter()
            .find(|a| a.field == field)
            .map(|a| Anchor { x: a.x, y: a.y })
    }

    /// Anchors for a group's slots; slots past the end are not drawn.
    pub fn group_anchors(&self, kind: GroupKind) -> &[Anchor] {
        match kind {
            GroupKind::LookedItems => &self.looked_items,
            GroupKind::PartsReplacement => &self.parts_replacement,
        }
    }
}
