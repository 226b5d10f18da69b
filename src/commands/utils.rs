use anyhow::Result;
use std::path::PathBuf;

use app_lock::settings::{FileSettings, get_settings_path};

/// Initialize logging
pub fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

/// Open the settings file from `--settings` or the default location
pub fn open_settings(path: Option<PathBuf>) -> Result<FileSettings> {
    let path = match path {
        Some(path) => path,
        None => get_settings_path()?,
    };

    FileSettings::open(path)
}

/// Format a number of seconds for display
pub fn format_seconds(secs: u64) -> String {
    if secs == 0 {
        "immediately".to_string()
    } else if secs < 60 {
        format!("{}s", secs)
    } else if secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_seconds_variants() {
        assert_eq!(format_seconds(0), "immediately");
        assert_eq!(format_seconds(45), "45s");
        assert_eq!(format_seconds(120), "2m");
        assert_eq!(format_seconds(150), "2m 30s");
    }

    #[test]
    fn open_settings_uses_explicit_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.yaml");

        let settings = open_settings(Some(path.clone())).unwrap();
        assert_eq!(settings.path(), path.as_path());
    }
}
