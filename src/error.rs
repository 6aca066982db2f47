//! Error types shared by the library and the `carform` binary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// User input rejected before anything was changed.
    #[error("{0}")]
    Validation(String),
    #[error("Invalid form file: {0}")]
    Form(String),
    #[error("Export failed: {0}")]
    Export(String),
    #[error("Failed to access preferences: {0}")]
    Preferences(String),
    #[error("Invalid layout: {0}")]
    Layout(String),
    #[error("Failed to load template: {0}")]
    Template(String),
    #[error("Failed to load font: {0}")]
    Font(String),
    #[error("Failed to render form: {0}")]
    Render(String),
    #[error("Failed to create PDF: {0}")]
    Pdf(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Validation failures are reported as warnings rather than errors.
    pub fn is_warning(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

impl From<csv::Error> for AppError {
    fn from(e: csv::Error) -> Self {
        AppError::Export(e.to_string())
    }
}
