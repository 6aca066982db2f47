//! Tabular export: form + preferences as ordered `(Item, Value)` rows,
//! written as a quoted, BOM-prefixed CSV file.

use crate::error::AppError;
use crate::form::{FormState, GroupKind};
use crate::preferences::{PreferenceRecord, APPLICATION_NAME};
use chrono::NaiveDateTime;
use directories::UserDirs;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const CSV_HEADER: [&str; 2] = ["Item", "Value"];

/// One exported `(label, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularRow {
    pub label: String,
    pub value: String,
}

impl TabularRow {
    fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Preferences first, then the main fields, then the visible entries of
/// each group labelled by slot position.
pub fn to_tabular_rows(form: &FormState, prefs: &PreferenceRecord) -> Vec<TabularRow> {
    let mut rows: Vec<TabularRow> = prefs
        .entries()
        .map(|(field, value)| TabularRow::new(field.label(), value))
        .collect();

    rows.extend(
        form.fields()
            .entries()
            .map(|(field, value)| TabularRow::new(field.label(), value)),
    );

    for kind in GroupKind::ALL {
        rows.extend(
            form.group(kind)
                .visible_slots()
                .map(|(index, value)| TabularRow::new(kind.slot_label(index), value)),
        );
    }

    rows
}

/// Write rows to any sink as CSV with every field quoted.
pub fn write_csv_to<W: Write>(mut out: W, rows: &[TabularRow]) -> Result<(), AppError> {
    out.write_all(UTF8_BOM)?;

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::CRLF)
        .from_writer(out);
    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.write_record([row.label.as_str(), row.value.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, rows: &[TabularRow]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::Export(format!("{}: {}", path.display(), e)))?;
    write_csv_to(BufWriter::new(file), rows)
}

/// Validate the form, then export it to `path`.
pub fn export_csv(form: &FormState, prefs: &PreferenceRecord, path: &Path) -> Result<(), AppError> {
    if !form.check_all_fields_filled() {
        return Err(AppError::Validation(
            "Please fill in all fields before saving.".to_string(),
        ));
    }

    let rows = to_tabular_rows(form, prefs);
    write_csv(path, &rows)?;
    info!("exported {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// `CarForm_<YYYY-MM-DD>_<HHMMSS>.csv`
pub fn default_export_filename(now: &NaiveDateTime) -> String {
    format!("{}_{}.csv", APPLICATION_NAME, now.format("%Y-%m-%d_%H%M%S"))
}

/// Desktop, else home, else the working directory.
pub fn default_export_dir() -> PathBuf {
    match UserDirs::new() {
        Some(dirs) => dirs
            .desktop_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dirs.home_dir().to_path_buf()),
        None => PathBuf::from("."),
    }
}

/// Append `.csv` unless the name already ends with it (any case).
pub fn with_csv_extension(path: PathBuf) -> PathBuf {
    let has_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if has_csv {
        path
    } else {
        let mut name = path.into_os_string();
        name.push(".csv");
        PathBuf::from(name)
    }
}
