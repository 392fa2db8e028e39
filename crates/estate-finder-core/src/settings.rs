// SPDX-License-Identifier: AGPL-3.0
// Estate Finder Core - Settings persistence
//
// Settings are stored as a local JSON document under the "settings" key.

use crate::storage::KeyValueStorage;
use crate::types::{AppError, AppSettings};
use std::sync::{Arc, PoisonError, RwLock};

const SETTINGS_KEY: &str = "settings";

/// In-memory cache of settings, persisted on changes
pub struct SettingsStore {
    settings: RwLock<AppSettings>,
    storage: Arc<dyn KeyValueStorage>,
}

impl SettingsStore {
    /// Create a settings store, loading from storage if available
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Result<Self, AppError> {
        let (settings, existed) = match storage.load(SETTINGS_KEY)? {
            Some(content) => {
                tracing::info!("Loading settings from storage");
                let settings = serde_json::from_str(&content).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse settings, using defaults: {}", e);
                    AppSettings::default()
                });
                (settings, true)
            }
            None => {
                tracing::info!("No settings found, using defaults");
                (AppSettings::default(), false)
            }
        };

        let store = Self {
            settings: RwLock::new(settings),
            storage,
        };

        // Persist defaults so the file can be edited by hand
        if !existed {
            tracing::info!("Creating initial settings file");
            store.persist()?;
        }

        Ok(store)
    }

    fn persist(&self) -> Result<(), AppError> {
        let content = {
            let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
            serde_json::to_string_pretty(&*settings).map_err(|e| {
                AppError::Serialization(format!("Failed to serialize settings: {}", e))
            })?
        };

        self.storage.save(SETTINGS_KEY, &content)
    }

    /// Get current settings
    pub fn get(&self) -> AppSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validate, replace and persist settings
    pub fn update(&self, new_settings: AppSettings) -> Result<(), AppError> {
        new_settings.validate()?;
        tracing::info!("Updating settings, api: {}", new_settings.api_base_url);
        {
            let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
            *settings = new_settings;
        }

        let result = self.persist();
        if result.is_ok() {
            tracing::info!("Settings persisted successfully");
        } else {
            tracing::error!("Failed to persist settings: {:?}", result);
        }
        result
    }
}
