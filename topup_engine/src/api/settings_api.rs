use std::{collections::BTreeMap, fmt::Debug};

use log::*;

use crate::{
    db_types::SiteSetting,
    traits::{SettingsError, SettingsManagement},
    validation::{is_blank, ValidationErrors},
};

/// Site-wide key/value settings, such as contact details or announcement banners.
pub struct SettingsApi<B> {
    db: B,
}

impl<B: Debug> Debug for SettingsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettingsApi ({:?})", self.db)
    }
}

impl<B> SettingsApi<B>
where B: SettingsManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// All settings as a plain key/value map.
    pub async fn public_settings(&self) -> Result<BTreeMap<String, String>, SettingsError> {
        let settings = self.db.fetch_settings().await?;
        Ok(settings.into_iter().map(|s| (s.setting_key, s.setting_value)).collect())
    }

    pub async fn all_settings(&self) -> Result<Vec<SiteSetting>, SettingsError> {
        self.db.fetch_settings().await
    }

    /// Either all the settings are stored, or none of them are.
    pub async fn upsert_settings(&self, settings: BTreeMap<String, String>) -> Result<(), SettingsError> {
        let mut errors = ValidationErrors::new();
        errors.check(!settings.is_empty(), "settings", "Settings object is required");
        for key in settings.keys() {
            errors.check(!is_blank(key), "settings", "Setting keys cannot be empty");
        }
        errors.into_result()?;
        let count = settings.len();
        self.db.upsert_settings(settings).await?;
        info!("⚙️ {count} settings updated");
        Ok(())
    }

    pub async fn upsert_setting(&self, key: &str, value: String) -> Result<(), SettingsError> {
        let mut errors = ValidationErrors::new();
        errors.check(!is_blank(key), "key", "Setting key is required");
        errors.check(!is_blank(&value), "value", "Setting value is required");
        errors.into_result()?;
        let mut settings = BTreeMap::new();
        settings.insert(key.trim().to_string(), value);
        self.db.upsert_settings(settings).await?;
        info!("⚙️ Setting '{key}' updated");
        Ok(())
    }

    pub async fn delete_setting(&self, key: &str) -> Result<(), SettingsError> {
        if self.db.delete_setting(key).await? {
            info!("⚙️ Setting '{key}' deleted");
            Ok(())
        } else {
            Err(SettingsError::SettingNotFound(key.to_string()))
        }
    }
}
