use clap::{Parser, Subcommand};
use std::path::PathBuf;

use app_lock::settings::LockTime;

/// App Lock
///
/// Password lock screen gate: after the app is backgrounded a countdown
/// runs, then a password is required to get back in.
#[derive(Parser, Debug)]
#[command(name = "app-lock")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the settings file (defaults to the per-user config directory)
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the app password
    Password {
        #[command(subcommand)]
        command: PasswordCommands,
    },
    /// Set how long the app may stay in the background before locking
    LockTime {
        /// One of: immediately, 1m, 2m, 3m
        #[arg(value_parser = parse_lock_time)]
        lock_time: LockTime,
    },
    /// Show current lock settings
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run an interactive lock session driven from stdin
    Session {
        /// Report the remaining countdown every N seconds
        #[arg(long)]
        progress: Option<u64>,

        /// Also show desktop notifications for lock events
        #[arg(long)]
        desktop_notifications: bool,

        /// Maximum password attempts per minute (0 = unlimited)
        #[arg(long, default_value = "5")]
        max_attempts: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum PasswordCommands {
    /// Set a new app password
    Set {
        /// New password
        #[arg(long)]
        password: String,

        /// New password again
        #[arg(long)]
        retype: String,
    },
    /// Switch password protection on or off
    Toggle {
        /// Current app password
        #[arg(long)]
        password: String,
    },
}

fn parse_lock_time(s: &str) -> Result<LockTime, String> {
    s.parse().map_err(|e: anyhow::Error| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lock_time_subcommand() {
        let args = Args::try_parse_from(["app-lock", "lock-time", "2m"]).unwrap();
        match args.command {
            Commands::LockTime { lock_time } => assert_eq!(lock_time, LockTime::TwoMinutes),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_lock_time() {
        assert!(Args::try_parse_from(["app-lock", "lock-time", "10m"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "app-lock",
            "show",
            "--json",
            "--settings",
            "/tmp/settings.yaml",
            "-v",
        ])
        .unwrap();

        assert!(args.verbose);
        assert_eq!(args.settings, Some(PathBuf::from("/tmp/settings.yaml")));
        assert!(matches!(args.command, Commands::Show { json: true }));
    }

    #[test]
    fn session_defaults() {
        let args = Args::try_parse_from(["app-lock", "session"]).unwrap();
        match args.command {
            Commands::Session {
                progress,
                desktop_notifications,
                max_attempts,
            } => {
                assert_eq!(progress, None);
                assert!(!desktop_notifications);
                assert_eq!(max_attempts, 5);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
