//! Form state: the fixed main fields, the two repeatable field groups and
//! the events that mutate them.

use crate::error::AppError;
use crate::text::to_halfwidth;
use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// Main Fields
// ============================================================================

/// The main (non-repeating) fields of an inspection record, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormField {
    #[serde(rename = "Registration number")]
    RegistrationNumber,
    #[serde(rename = "Model number")]
    ModelNumber,
    #[serde(rename = "Travel distance")]
    TravelDistance,
    #[serde(rename = "Checked year")]
    CheckedYear,
    #[serde(rename = "Checked month")]
    CheckedMonth,
    #[serde(rename = "Checked day")]
    CheckedDay,
    #[serde(rename = "Maintained year")]
    MaintainedYear,
    #[serde(rename = "Maintained month")]
    MaintainedMonth,
    #[serde(rename = "Maintained day")]
    MaintainedDay,
}

impl FormField {
    pub const ALL: [FormField; 9] = [
        FormField::RegistrationNumber,
        FormField::ModelNumber,
        FormField::TravelDistance,
        FormField::CheckedYear,
        FormField::CheckedMonth,
        FormField::CheckedDay,
        FormField::MaintainedYear,
        FormField::MaintainedMonth,
        FormField::MaintainedDay,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::RegistrationNumber => "Registration number",
            FormField::ModelNumber => "Model number",
            FormField::TravelDistance => "Travel distance",
            FormField::CheckedYear => "Checked year",
            FormField::CheckedMonth => "Checked month",
            FormField::CheckedDay => "Checked day",
            FormField::MaintainedYear => "Maintained year",
            FormField::MaintainedMonth => "Maintained month",
            FormField::MaintainedDay => "Maintained day",
        }
    }

    /// Example value shown to the user as an input hint.
    pub fn placeholder(self) -> &'static str {
        match self {
            FormField::RegistrationNumber => "富士山 300 り 8888",
            FormField::ModelNumber => "AA100A-1001001",
            FormField::TravelDistance => "0",
            FormField::CheckedYear => "20250101",
            FormField::CheckedMonth => "01",
            FormField::CheckedDay => "01",
            FormField::MaintainedYear => "20250202",
            FormField::MaintainedMonth => "02",
            FormField::MaintainedDay => "02",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FormField {
    type Err = AppError;

    /// Accepts the label case-insensitively, with or without a trailing colon.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_end_matches(':').trim();
        FormField::ALL
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::Validation(format!("Unknown field: {}", s)))
    }
}

// ============================================================================
// Form Snapshot
// ============================================================================

/// Current value of every main field. Fields are cleared, never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>")]
pub struct FormSnapshot {
    values: [String; 9],
}

impl FormSnapshot {
    pub fn get(&self, field: FormField) -> &str {
        &self.values[field.index()]
    }

    /// Store a value, folding full-width alphanumerics to half-width.
    pub fn set(&mut self, field: FormField, value: &str) {
        self.values[field.index()] = to_halfwidth(value);
    }

    /// Fields and values in declared order.
    pub fn entries(&self) -> impl Iterator<Item = (FormField, &str)> + '_ {
        FormField::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    pub fn clear(&mut self) {
        for value in self.values.iter_mut() {
            value.clear();
        }
    }
}

impl Serialize for FormSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (field, value) in self.entries() {
            map.serialize_entry(field.label(), value)?;
        }
        map.end()
    }
}

impl TryFrom<BTreeMap<String, String>> for FormSnapshot {
    type Error = AppError;

    fn try_from(raw: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut snapshot = FormSnapshot::default();
        for (key, value) in raw {
            let field: FormField = key.parse()?;
            snapshot.set(field, &value);
        }
        Ok(snapshot)
    }
}

// ============================================================================
// Repeatable Field Groups
// ============================================================================

/// The two repeatable groups on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    LookedItems,
    PartsReplacement,
}

impl GroupKind {
    pub const ALL: [GroupKind; 2] = [GroupKind::LookedItems, GroupKind::PartsReplacement];

    pub fn capacity(self) -> usize {
        match self {
            GroupKind::LookedItems => 9,
            GroupKind::PartsReplacement => 5,
        }
    }

    /// Heading of the group as shown on the form.
    pub fn title(self) -> &'static str {
        match self {
            GroupKind::LookedItems => "Looked items",
            GroupKind::PartsReplacement => "Parts replacement",
        }
    }

    /// Base of the per-item label used in exports.
    pub fn item_label(self) -> &'static str {
        match self {
            GroupKind::LookedItems => "Looked item",
            GroupKind::PartsReplacement => "Parts replacement",
        }
    }

    /// Label of the slot at `index`: the base label for slot 0,
    /// `<base><index + 1>` afterwards.
    pub fn slot_label(self, index: usize) -> String {
        if index == 0 {
            self.item_label().to_string()
        } else {
            format!("{}{}", self.item_label(), index.saturating_add(1))
        }
    }
}

/// One entry of a field group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub visible: bool,
}

/// Fixed-capacity list of entries that are revealed one at a time.
///
/// Slot 0 is always visible. Any other slot can be hidden, which clears
/// its value but keeps its position; out-of-range indices are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGroup {
    kind: GroupKind,
    slots: Vec<Slot>,
}

impl FieldGroup {
    pub fn new(kind: GroupKind) -> Self {
        let slots = (0..kind.capacity())
            .map(|i| Slot {
                value: String::new(),
                visible: i == 0,
            })
            .collect();
        Self { kind, slots }
    }

    /// Rebuild a group from persisted slots, restoring its invariants.
    fn from_slots(kind: GroupKind, mut stored: Vec<Slot>) -> Result<Self, AppError> {
        if stored.len() > kind.capacity() {
            return Err(AppError::Form(format!(
                "{} holds {} entries, at most {} allowed",
                kind.title(),
                stored.len(),
                kind.capacity()
            )));
        }
        stored.resize_with(kind.capacity(), Slot::default);

        let mut group = Self { kind, slots: Vec::with_capacity(stored.len()) };
        for (i, slot) in stored.into_iter().enumerate() {
            let visible = i == 0 || slot.visible;
            let value = if visible { to_halfwidth(&slot.value) } else { String::new() };
            group.slots.push(Slot { value, visible });
        }
        Ok(group)
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn visible_count(&self) -> usize {
        self.slots.iter().filter(|s| s.visible).count()
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|s| s.visible)
    }

    /// Show the slot after `index`. Only a visible slot can reveal its
    /// successor; the last slot has none.
    pub fn reveal(&mut self, index: usize) {
        if !self.is_visible(index) {
            return;
        }
        if let Some(next) = self.slots.get_mut(index + 1) {
            next.visible = true;
        }
    }

    /// Hide the slot at `index` and clear it. Slot 0 is permanent.
    pub fn hide(&mut self, index: usize) {
        if index == 0 {
            return;
        }
        if let Some(slot) = self.slots.get_mut(index) {
            slot.visible = false;
            slot.value.clear();
        }
    }

    /// Set the value of a visible slot. Returns false if the slot is
    /// hidden or out of range.
    pub fn set_value(&mut self, index: usize, value: &str) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.visible => {
                slot.value = to_halfwidth(value);
                true
            }
            _ => false,
        }
    }

    /// Visible slots with their indices, in slot order.
    pub fn visible_slots(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.visible)
            .map(|(i, s)| (i, s.value.as_str()))
    }

    pub fn visible_values(&self) -> impl Iterator<Item = &str> + '_ {
        self.visible_slots().map(|(_, v)| v)
    }

    pub fn reset(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.value.clear();
            slot.visible = i == 0;
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Which date the auto-fill and date-picker operations write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DateTarget {
    Checked,
    Maintained,
}

impl DateTarget {
    pub fn fields(self) -> (FormField, FormField, FormField) {
        match self {
            DateTarget::Checked => (
                FormField::CheckedYear,
                FormField::CheckedMonth,
                FormField::CheckedDay,
            ),
            DateTarget::Maintained => (
                FormField::MaintainedYear,
                FormField::MaintainedMonth,
                FormField::MaintainedDay,
            ),
        }
    }
}

/// A single user action on the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    ValueChanged { field: FormField, value: String },
    GroupValueChanged { group: GroupKind, index: usize, value: String },
    Reveal { group: GroupKind, index: usize },
    Hide { group: GroupKind, index: usize },
    AutoFill(DateTarget),
    PickDate { target: DateTarget, date: NaiveDate },
    Reset,
}

// ============================================================================
// Form State
// ============================================================================

/// Complete state of one inspection form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FormDocument", into = "FormDocument")]
pub struct FormState {
    fields: FormSnapshot,
    looked_items: FieldGroup,
    parts_replacement: FieldGroup,
}

/// On-disk shape of a form.
#[derive(Serialize, Deserialize)]
struct FormDocument {
    #[serde(default)]
    fields: FormSnapshot,
    #[serde(default)]
    looked_items: Vec<Slot>,
    #[serde(default)]
    parts_replacement: Vec<Slot>,
}

impl From<FormState> for FormDocument {
    fn from(state: FormState) -> Self {
        Self {
            fields: state.fields,
            looked_items: state.looked_items.slots,
            parts_replacement: state.parts_replacement.slots,
        }
    }
}

impl TryFrom<FormDocument> for FormState {
    type Error = AppError;

    fn try_from(doc: FormDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            fields: doc.fields,
            looked_items: FieldGroup::from_slots(GroupKind::LookedItems, doc.looked_items)?,
            parts_replacement: FieldGroup::from_slots(
                GroupKind::PartsReplacement,
                doc.parts_replacement,
            )?,
        })
    }
}

impl Default for FormState {
    fn default() -> Self {
        Self::new()
    }
}

impl FormState {
    pub fn new() -> Self {
        Self {
            fields: FormSnapshot::default(),
            looked_items: FieldGroup::new(GroupKind::LookedItems),
            parts_replacement: FieldGroup::new(GroupKind::PartsReplacement),
        }
    }

    pub fn fields(&self) -> &FormSnapshot {
        &self.fields
    }

    pub fn field(&self, field: FormField) -> &str {
        self.fields.get(field)
    }

    pub fn set_field(&mut self, field: FormField, value: &str) {
        self.fields.set(field, value);
    }

    pub fn group(&self, kind: GroupKind) -> &FieldGroup {
        match kind {
            GroupKind::LookedItems => &self.looked_items,
            GroupKind::PartsReplacement => &self.parts_replacement,
        }
    }

    pub fn group_mut(&mut self, kind: GroupKind) -> &mut FieldGroup {
        match kind {
            GroupKind::LookedItems => &mut self.looked_items,
            GroupKind::PartsReplacement => &mut self.parts_replacement,
        }
    }

    /// Apply one user action.
    pub fn apply(&mut self, event: FormEvent) -> Result<(), AppError> {
        debug!("applying {:?}", event);
        match event {
            FormEvent::ValueChanged { field, value } => self.set_field(field, &value),
            FormEvent::GroupValueChanged { group, index, value } => {
                if !self.group_mut(group).set_value(index, &value) {
                    return Err(AppError::Validation(format!(
                        "{} is not visible",
                        group.slot_label(index)
                    )));
                }
            }
            FormEvent::Reveal { group, index } => self.group_mut(group).reveal(index),
            FormEvent::Hide { group, index } => self.group_mut(group).hide(index),
            FormEvent::AutoFill(target) => self.auto_fill(target)?,
            FormEvent::PickDate { target, date } => self.pick_date(target, date),
            FormEvent::Reset => self.reset(),
        }
        Ok(())
    }

    /// Split an 8-character `YYYYMMDD` string in the year field into the
    /// year, month and day fields.
    pub fn auto_fill(&mut self, target: DateTarget) -> Result<(), AppError> {
        let (year_field, month_field, day_field) = target.fields();
        let chars: Vec<char> = self.field(year_field).chars().collect();
        if chars.len() != 8 {
            return Err(AppError::Validation(
                "Invalid date format. Please use YYYYMMDD format.".to_string(),
            ));
        }

        let year: String = chars[..4].iter().collect();
        let month: String = chars[4..6].iter().collect();
        let day: String = chars[6..].iter().collect();

        self.set_field(year_field, &year);
        self.set_field(month_field, &month);
        self.set_field(day_field, &day);
        Ok(())
    }

    /// Write a calendar date as a four-digit year and zero-padded month and day.
    pub fn pick_date(&mut self, target: DateTarget, date: NaiveDate) {
        let (year_field, month_field, day_field) = target.fields();
        self.set_field(year_field, &date.year().to_string());
        self.set_field(month_field, &format!("{:02}", date.month()));
        self.set_field(day_field, &format!("{:02}", date.day()));
    }

    /// True when every main field and every visible group entry has text.
    pub fn check_all_fields_filled(&self) -> bool {
        let fields_filled = self.fields.entries().all(|(_, v)| !v.trim().is_empty());
        let groups_filled = GroupKind::ALL
            .into_iter()
            .all(|g| self.group(g).visible_values().all(|v| !v.trim().is_empty()));
        fields_filled && groups_filled
    }

    pub fn reset(&mut self) {
        self.fields.clear();
        self.looked_items.reset();
        self.parts_replacement.reset();
    }

    /// Load a form document. A missing file yields a fresh form.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            info!("{} does not exist, starting a new form", path.display());
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Form(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Form(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
