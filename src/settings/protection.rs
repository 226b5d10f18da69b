use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{MutableSettings, SettingValue, configured_password, keys};
use crate::lock::auth::{hash_password, verify_password};

/// Characters allowed in a password besides ASCII letters and digits
pub const PASSWORD_SPECIALS: &str = "@#$%^&+!=";

/// Minimum password length
pub const MIN_PASSWORD_LEN: usize = 10;

/// Check a new password against the strength rules
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        anyhow::bail!("Password must be at least {} characters long", MIN_PASSWORD_LEN);
    }

    if let Some(c) = password
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !PASSWORD_SPECIALS.contains(*c))
    {
        anyhow::bail!(
            "Password contains unsupported character '{}' (allowed specials: {})",
            c,
            PASSWORD_SPECIALS
        );
    }

    let mut missing = Vec::new();
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        missing.push("a lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        missing.push("an uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("a digit");
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        missing.push("a special character");
    }

    if !missing.is_empty() {
        anyhow::bail!("Password must contain {}", missing.join(", "));
    }

    Ok(())
}

/// Store a new app password after checking both entries and the rules
///
/// Only the Argon2 hash is written to the store.
pub fn set_password(store: &dyn MutableSettings, password: &str, retype: &str) -> Result<()> {
    if password != retype {
        anyhow::bail!("Passwords do not match");
    }

    validate_password(password)?;

    let hash = hash_password(password)?;
    store.save(keys::APP_PASSWORD, SettingValue::from(hash))?;
    tracing::info!("App password updated");
    Ok(())
}

/// Flip password protection on or off, returning the new setting
///
/// The current password is required either way.
pub fn toggle_protection(store: &dyn MutableSettings, password: &str) -> Result<bool> {
    let Some(stored) = configured_password(store) else {
        anyhow::bail!("No app password configured; set one first");
    };

    if !verify_password(password, &stored)? {
        anyhow::bail!("Wrong password");
    }

    let enabled = !store.get_bool(keys::APP_PASSWORD_ENABLED, false);
    store.save(keys::APP_PASSWORD_ENABLED, SettingValue::Bool(enabled))?;

    tracing::info!(
        "Password protection {}",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(enabled)
}

/// Selectable lock delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockTime {
    /// Arm as soon as the app goes to the background
    Immediately,
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "2m")]
    TwoMinutes,
    #[serde(rename = "3m")]
    ThreeMinutes,
}

impl LockTime {
    pub const ALL: [LockTime; 4] = [
        LockTime::Immediately,
        LockTime::OneMinute,
        LockTime::TwoMinutes,
        LockTime::ThreeMinutes,
    ];

    pub fn seconds(self) -> i64 {
        match self {
            LockTime::Immediately => 0,
            LockTime::OneMinute => 60,
            LockTime::TwoMinutes => 120,
            LockTime::ThreeMinutes => 180,
        }
    }

    fn name(self) -> &'static str {
        match self {
            LockTime::Immediately => "immediately",
            LockTime::OneMinute => "1m",
            LockTime::TwoMinutes => "2m",
            LockTime::ThreeMinutes => "3m",
        }
    }
}

impl fmt::Display for LockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LockTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        LockTime::ALL
            .into_iter()
            .find(|preset| preset.name() == normalized)
            .or(match normalized.as_str() {
                "0" | "now" => Some(LockTime::Immediately),
                "60" => Some(LockTime::OneMinute),
                "120" => Some(LockTime::TwoMinutes),
                "180" => Some(LockTime::ThreeMinutes),
                _ => None,
            })
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown lock time '{}' (expected one of: immediately, 1m, 2m, 3m)",
                    s
                )
            })
    }
}

/// Store the lock delay preset
pub fn set_lock_time(store: &dyn MutableSettings, lock_time: LockTime) -> Result<()> {
    store.save(keys::LOCK_TIME, SettingValue::Int(lock_time.seconds()))?;
    tracing::info!("Lock time set to {} ({}s)", lock_time, lock_time.seconds());
    Ok(())
}
