use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use super::{MutableSettings, SettingValue, SettingsStore, as_bool, as_int, as_string};
use crate::platform::common::atomic_write_private;

/// Settings persisted as a flat YAML map
///
/// Values are cached in memory; `reload` picks up edits made by another
/// process. Every `save` rewrites the whole file atomically.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: RwLock<BTreeMap<String, SettingValue>>,
}

impl FileSettings {
    /// Open the settings file, starting empty if it doesn't exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = read_values(&path)?;

        tracing::debug!("Loaded {} settings from {}", values.len(), path.display());

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the backing file, replacing the cached values
    pub fn reload(&self) -> Result<()> {
        let values = read_values(&self.path)?;
        *self.values.write().unwrap_or_else(PoisonError::into_inner) = values;
        Ok(())
    }

    /// Snapshot of every stored key
    pub fn entries(&self) -> BTreeMap<String, SettingValue> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn get(&self, key: &str) -> Option<SettingValue> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl SettingsStore for FileSettings {
    fn get_int(&self, key: &str) -> Option<i64> {
        as_int(self.get(key).as_ref())
    }

    fn get_string(&self, key: &str) -> Option<String> {
        as_string(self.get(key).as_ref())
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        as_bool(self.get(key).as_ref()).unwrap_or(default)
    }
}

impl MutableSettings for FileSettings {
    fn save(&self, key: &str, value: SettingValue) -> Result<()> {
        // Hold the write lock across the file write so saves can't interleave
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);

        let mut updated = values.clone();
        updated.insert(key.to_string(), value);

        let content = serde_yaml::to_string(&updated).context("Failed to serialize settings")?;

        atomic_write_private(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to write settings file: {}", self.path.display()))?;

        *values = updated;
        tracing::debug!("Saved setting '{}' to {}", key, self.path.display());
        Ok(())
    }
}

fn read_values(path: &Path) -> Result<BTreeMap<String, SettingValue>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse settings file: {}", path.display()))
}

/// Get the per-user settings file path
pub fn get_settings_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "app-lock")
        .context("Could not determine settings file location")?;

    Ok(dirs.config_dir().join("settings.yaml"))
}
