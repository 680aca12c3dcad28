//! Persisted client settings.
//!
//! The store is an explicit value: it is initialized from storage, merged
//! field-by-field over the defaults (so older or partial records stay
//! valid), and persists itself on every change. Callers pass it around by
//! reference; there is no global instance.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::SettingsError;
use crate::request::{InputType, StartPosition};

/// Fixed storage key for the settings record.
pub const SETTINGS_KEY: &str = "strat-opt-settings";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: String,
    pub input_type: InputType,
    pub cash_rate: f64,
    pub start_invested: StartPosition,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "slate".to_string(),
            input_type: InputType::Csv,
            cash_rate: 0.04,
            start_invested: StartPosition::Invested,
        }
    }
}

impl Settings {
    /// Merge a stored JSON record over `defaults`.
    ///
    /// Each field is taken from the record only if it is present and has the
    /// right shape; anything else keeps the default. A record that is not a
    /// JSON object yields the defaults unchanged.
    pub fn merge_stored(defaults: &Settings, raw: &str) -> Settings {
        let mut merged = defaults.clone();
        let map = match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::warn!("stored settings are not a JSON object; using defaults");
                return merged;
            }
        };

        fn field<T: DeserializeOwned>(
            map: &serde_json::Map<String, serde_json::Value>,
            key: &str,
        ) -> Option<T> {
            let value = map.get(key)?.clone();
            match serde_json::from_value(value) {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("ignoring stored setting {key}: {e}");
                    None
                }
            }
        }

        if let Some(v) = field(&map, "theme") {
            merged.theme = v;
        }
        if let Some(v) = field(&map, "inputType") {
            merged.input_type = v;
        }
        if let Some(v) = field::<f64>(&map, "cashRate") {
            merged.cash_rate = v;
        }
        if let Some(v) = field(&map, "startInvested") {
            merged.start_invested = v;
        }
        merged
    }
}

/// Partial update; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub theme: Option<String>,
    pub input_type: Option<InputType>,
    pub cash_rate: Option<f64>,
    pub start_invested: Option<StartPosition>,
}

/// Key/value backing store for the settings record.
pub trait SettingsStorage: Send {
    fn read(&self, key: &str) -> Result<Option<String>, SettingsError>;
    fn write(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SettingsStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, SettingsError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// In-memory storage. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let storage = Self::default();
        storage.lock().insert(key.to_string(), value.to_string());
        storage
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SettingsStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.get(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings plus the storage they persist to.
pub struct SettingsStore {
    settings: Settings,
    storage: Box<dyn SettingsStorage>,
}

impl SettingsStore {
    /// Load from storage and merge over the built-in defaults.
    pub fn load(storage: Box<dyn SettingsStorage>) -> Self {
        Self::load_with_defaults(storage, Settings::default())
    }

    pub fn load_with_defaults(storage: Box<dyn SettingsStorage>, defaults: Settings) -> Self {
        let settings = match storage.read(SETTINGS_KEY) {
            Ok(Some(raw)) => Settings::merge_stored(&defaults, &raw),
            Ok(None) => defaults,
            Err(e) => {
                tracing::warn!("failed to read settings, using defaults: {e}");
                defaults
            }
        };
        Self { settings, storage }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Apply a patch and persist if anything changed.
    pub fn update(&mut self, patch: SettingsPatch) -> Result<(), SettingsError> {
        let mut next = self.settings.clone();
        if let Some(theme) = patch.theme {
            next.theme = theme;
        }
        if let Some(input_type) = patch.input_type {
            next.input_type = input_type;
        }
        if let Some(cash_rate) = patch.cash_rate {
            next.cash_rate = cash_rate;
        }
        if let Some(start) = patch.start_invested {
            next.start_invested = start;
        }

        if next == self.settings {
            return Ok(());
        }
        self.settings = next;
        self.persist()
    }

    fn persist(&self) -> Result<(), SettingsError> {
        let json = serde_json::to_string(&self.settings)?;
        self.storage.write(SETTINGS_KEY, &json).map_err(|e| {
            tracing::warn!("failed to persist settings: {e}");
            e
        })
    }
}
