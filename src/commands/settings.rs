use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use app_lock::settings::{
    self, FileSettings, LockTime, SettingsStore, keys, set_lock_time, set_password,
    toggle_protection,
};

use super::utils::format_seconds;

/// Set a new app password
pub fn password_set(settings: &FileSettings, password: &str, retype: &str) -> Result<()> {
    set_password(settings, password, retype).context("Failed to set app password")?;

    println!("✓ App password saved to {}", settings.path().display());
    if !settings.get_bool(keys::APP_PASSWORD_ENABLED, false) {
        println!("\nPassword protection is currently off. Turn it on with:");
        println!("  app-lock password toggle --password <password>");
    }

    Ok(())
}

/// Switch password protection on or off
pub fn password_toggle(settings: &FileSettings, password: &str) -> Result<()> {
    let enabled =
        toggle_protection(settings, password).context("Failed to change password protection")?;

    if enabled {
        println!("✓ Password protection enabled");
    } else {
        println!("✓ Password protection disabled");
    }

    Ok(())
}

/// Set the lock delay preset
pub fn lock_time(settings: &FileSettings, lock_time: LockTime) -> Result<()> {
    set_lock_time(settings, lock_time)?;
    println!(
        "✓ App will lock {} after going to the background",
        match lock_time {
            LockTime::Immediately => "immediately".to_string(),
            other => format!("{} ({})", other, format_seconds(other.seconds() as u64)),
        }
    );
    Ok(())
}

/// What `show` reports
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SettingsReport {
    pub settings_path: PathBuf,
    pub lock_time_seconds: u64,
    pub password_configured: bool,
    pub protection_enabled: bool,
    /// Whether the lock can arm at all
    pub protection_active: bool,
}

pub fn build_report<S: SettingsStore + ?Sized>(store: &S, path: &Path) -> SettingsReport {
    SettingsReport {
        settings_path: path.to_path_buf(),
        lock_time_seconds: settings::lock_delay_seconds(store),
        password_configured: settings::configured_password(store).is_some(),
        protection_enabled: store.get_bool(keys::APP_PASSWORD_ENABLED, false),
        protection_active: settings::protection_active(store),
    }
}

/// Show current lock settings
pub fn show(settings: &FileSettings, json: bool) -> Result<()> {
    let report = build_report(settings, settings.path());

    if json {
        let content =
            serde_json::to_string_pretty(&report).context("Failed to serialize settings report")?;
        println!("{}", content);
        return Ok(());
    }

    println!("App Lock Settings");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Settings file: {}", report.settings_path.display());
    println!("Lock time:     {}", format_seconds(report.lock_time_seconds));
    let password = if report.password_configured {
        "********"
    } else {
        "(not set)"
    };
    println!("Password:      {}", password);
    println!(
        "Protection:    {}",
        match (report.protection_enabled, report.protection_active) {
            (true, true) => "enabled",
            (true, false) => "enabled, but no password is set",
            (false, _) => "disabled",
        }
    );

    Ok(())
}
