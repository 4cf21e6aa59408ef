use std::collections::BTreeMap;

use thiserror::Error;

use crate::{db_types::SiteSetting, validation::ValidationErrors};

#[derive(Debug, Clone, Error)]
pub enum SettingsError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid setting. {0}")]
    ValidationError(ValidationErrors),
    #[error("Setting not found: {0}")]
    SettingNotFound(String),
}

impl From<sqlx::Error> for SettingsError {
    fn from(e: sqlx::Error) -> Self {
        SettingsError::DatabaseError(e.to_string())
    }
}

impl From<ValidationErrors> for SettingsError {
    fn from(e: ValidationErrors) -> Self {
        SettingsError::ValidationError(e)
    }
}

/// Storage for site-wide key/value settings.
#[allow(async_fn_in_trait)]
pub trait SettingsManagement {
    /// Every setting, ordered by key.
    async fn fetch_settings(&self) -> Result<Vec<SiteSetting>, SettingsError>;

    /// Inserts or replaces all the given settings atomically.
    async fn upsert_settings(&self, settings: BTreeMap<String, String>) -> Result<(), SettingsError>;

    /// Removes the setting. Returns false if there was no setting with that key.
    async fn delete_setting(&self, key: &str) -> Result<bool, SettingsError>;
}
