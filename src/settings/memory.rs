use anyhow::Result;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{MutableSettings, SettingValue, SettingsStore, as_bool, as_int, as_string};

/// Settings held in process memory
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, SettingValue>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a list of initial values
    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, SettingValue)>,
        K: Into<String>,
    {
        Self {
            values: RwLock::new(values.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    /// Remove a key
    pub fn remove(&self, key: &str) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn get(&self, key: &str) -> Option<SettingValue> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl SettingsStore for MemorySettings {
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

impl MutableSettings for MemorySettings {
    fn save(&self, key: &str, value: SettingValue) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::keys;

    #[test]
    fn typed_reads_ignore_mismatched_values() {
        let store = MemorySettings::with_values([
            (keys::LOCK_TIME, SettingValue::Int(60)),
            (keys::APP_PASSWORD, SettingValue::Int(1234)),
        ]);

        assert_eq!(store.get_int(keys::LOCK_TIME), Some(60));
        assert_eq!(store.get_string(keys::APP_PASSWORD), None);
        assert!(store.get_bool(keys::APP_PASSWORD_ENABLED, true));
        assert!(!store.get_bool(keys::APP_PASSWORD_ENABLED, false));
    }

    #[test]
    fn save_overwrites_and_remove_clears() {
        let store = MemorySettings::new();
        store.save(keys::LOCK_TIME, SettingValue::Int(60)).unwrap();
        store.save(keys::LOCK_TIME, SettingValue::Int(120)).unwrap();
        assert_eq!(store.get_int(keys::LOCK_TIME), Some(120));

        store.remove(keys::LOCK_TIME);
        assert_eq!(store.get_int(keys::LOCK_TIME), None);
    }
}
