//! Business details printed on every form, persisted between sessions.

use crate::error::AppError;
use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ORGANIZATION_NAME: &str = "amaterasuqbb";
pub const APPLICATION_NAME: &str = "CarForm";

const PREFERENCES_FILE: &str = "preferences.json";

/// The four persisted preference values. Missing keys read as "".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceRecord {
    pub business_name: String,
    pub address: String,
    pub phone_number: String,
    pub cellphone_number: String,
}

/// Identifies one preference value, in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceField {
    BusinessName,
    Address,
    PhoneNumber,
    CellphoneNumber,
}

impl PreferenceField {
    pub const ALL: [PreferenceField; 4] = [
        PreferenceField::BusinessName,
        PreferenceField::Address,
        PreferenceField::PhoneNumber,
        PreferenceField::CellphoneNumber,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PreferenceField::BusinessName => "Business name",
            PreferenceField::Address => "Address",
            PreferenceField::PhoneNumber => "Telephone number",
            PreferenceField::CellphoneNumber => "Cellphone number",
        }
    }
}

impl PreferenceRecord {
    pub fn get(&self, field: PreferenceField) -> &str {
        match field {
            PreferenceField::BusinessName => &self.business_name,
            PreferenceField::Address => &self.address,
            PreferenceField::PhoneNumber => &self.phone_number,
            PreferenceField::CellphoneNumber => &self.cellphone_number,
        }
    }

    pub fn set(&mut self, field: PreferenceField, value: String) {
        match field {
            PreferenceField::BusinessName => self.business_name = value,
            PreferenceField::Address => self.address = value,
            PreferenceField::PhoneNumber => self.phone_number = value,
            PreferenceField::CellphoneNumber => self.cellphone_number = value,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (PreferenceField, &str)> + '_ {
        PreferenceField::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

/// JSON-file settings store scoped to the application.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    /// Store inside `config_dir`.
    pub fn in_dir(config_dir: &Path) -> Self {
        Self {
            path: config_dir.join(PREFERENCES_FILE),
        }
    }

    /// Store in the platform config directory for this application.
    pub fn open_default() -> Result<Self, AppError> {
        let dirs = ProjectDirs::from("", ORGANIZATION_NAME, APPLICATION_NAME).ok_or_else(|| {
            AppError::Preferences("no home directory to keep settings in".to_string())
        })?;
        Ok(Self::in_dir(dirs.config_dir()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved record, or an empty one if nothing was saved yet.
    pub fn load(&self) -> Result<PreferenceRecord, AppError> {
        if !self.path.exists() {
            debug!("no preferences at {}", self.path.display());
            return Ok(PreferenceRecord::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AppError::Preferences(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Preferences(format!("{}: {}", self.path.display(), e)))
    }

    pub fn save(&self, record: &PreferenceRecord) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Preferences(format!("{}: {}", parent.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| AppError::Preferences(e.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|e| AppError::Preferences(format!("{}: {}", self.path.display(), e)))?;
        info!("saved preferences to {}", self.path.display());
        Ok(())
    }

    /// Forget every saved value.
    pub fn restore_defaults(&self) -> Result<(), AppError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("removed {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Preferences(format!("{}: {}", self.path.display(), e))),
        }
    }
}
