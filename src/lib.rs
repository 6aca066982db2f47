//! carform: fill, export and print vehicle inspection records.
//!
//! A form is a fixed set of main fields plus two repeatable groups
//! ("Looked items" and "Parts replacement"). Together with the persisted
//! business preferences it can be exported as CSV rows or drawn onto the
//! A4 inspection template for printing.

pub mod error;
pub mod export;
pub mod form;
pub mod layout;
pub mod preferences;
pub mod print;
pub mod render;
pub mod text;

pub use error::AppError;
pub use export::{export_csv, to_tabular_rows, TabularRow};
pub use form::{DateTarget, FieldGroup, FormEvent, FormField, FormSnapshot, FormState, GroupKind};
pub use layout::TemplateLayout;
pub use preferences::{PreferenceField, PreferenceRecord, PreferenceStore};
pub use print::{print_form, PrintJob};
pub use render::{render_to_canvas, Typeface};
