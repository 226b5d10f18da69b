/// Persisted settings consumed by the lock coordinator
///
/// This module provides:
/// - The read-only `SettingsStore` lookup the coordinator depends on
/// - Writable stores (in-memory and YAML file-backed)
/// - Password and lock-delay management on top of a writable store

pub mod file;
pub mod memory;
pub mod protection;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use file::{FileSettings, get_settings_path};
pub use memory::MemorySettings;
pub use protection::{LockTime, set_lock_time, set_password, toggle_protection, validate_password};

/// Setting keys
pub mod keys {
    /// Countdown length in seconds before the password challenge is armed
    pub const LOCK_TIME: &str = "lock_time";
    /// Argon2 PHC hash of the app password
    pub const APP_PASSWORD: &str = "app_password";
    /// Whether password protection is switched on
    pub const APP_PASSWORD_ENABLED: &str = "app_password_enabled";
}

/// A single stored setting value
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Key/value lookup of the lock settings
///
/// Absent keys (or keys holding a value of another type) read as `None`;
/// callers decide what absence means.
pub trait SettingsStore: Send + Sync {
    fn get_int(&self, key: &str) -> Option<i64>;

    fn get_string(&self, key: &str) -> Option<String>;

    fn get_bool(&self, key: &str, default: bool) -> bool;
}

/// A settings store that can also be written
pub trait MutableSettings: SettingsStore {
    fn save(&self, key: &str, value: SettingValue) -> Result<()>;
}

/// Typed lookup over a raw value, shared by the store implementations
pub(crate) fn as_int(value: Option<&SettingValue>) -> Option<i64> {
    match value? {
        SettingValue::Int(n) => Some(*n),
        // Older settings files may hold the delay as a quoted number
        SettingValue::Str(s) => s.trim().parse().ok(),
        SettingValue::Bool(_) => None,
    }
}

pub(crate) fn as_string(value: Option<&SettingValue>) -> Option<String> {
    match value? {
        SettingValue::Str(s) => Some(s.clone()),
        _ => None,
    }
}

pub(crate) fn as_bool(value: Option<&SettingValue>) -> Option<bool> {
    match value? {
        SettingValue::Bool(b) => Some(*b),
        _ => None,
    }
}

/// Lock delay in seconds as configured; absent or negative reads as zero
pub fn lock_delay_seconds<S: SettingsStore + ?Sized>(store: &S) -> u64 {
    store
        .get_int(keys::LOCK_TIME)
        .map(|secs| secs.max(0) as u64)
        .unwrap_or(0)
}

/// The configured password, if one is set and non-empty
pub fn configured_password<S: SettingsStore + ?Sized>(store: &S) -> Option<String> {
    store
        .get_string(keys::APP_PASSWORD)
        .filter(|password| !password.is_empty())
}

/// Whether the lock can ever arm: protection switched on and a password set
pub fn protection_active<S: SettingsStore + ?Sized>(store: &S) -> bool {
    store.get_bool(keys::APP_PASSWORD_ENABLED, false) && configured_password(store).is_some()
}
