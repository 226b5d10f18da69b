use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use app_lock::lock::{self, DesktopNotifier, Gate, GateOutcome, LockCoordinator, TracingObserver};
use app_lock::settings::FileSettings;

use super::utils::{format_seconds, open_settings};

/// Commands accepted on stdin during a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// App went to the background: start the countdown
    Background,
    /// App came back: cancel the countdown / clear an unlocked lock
    Foreground,
    Status,
    Unlock(String),
    Back,
    Help,
    Quit,
}

impl SessionCommand {
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_lowercase().as_str() {
            "" => return Ok(None),
            "background" | "bg" => SessionCommand::Background,
            "foreground" | "fg" => SessionCommand::Foreground,
            "status" => SessionCommand::Status,
            "unlock" => {
                if rest.is_empty() {
                    anyhow::bail!("Usage: unlock <password>");
                }
                SessionCommand::Unlock(rest.to_string())
            }
            "back" => SessionCommand::Back,
            "help" | "?" => SessionCommand::Help,
            "quit" | "exit" => SessionCommand::Quit,
            other => anyhow::bail!("Unknown command '{}' (type 'help')", other),
        };

        Ok(Some(command))
    }
}

const HELP: &str = "\
Commands:
  background | bg     app went to the background (start the lock countdown)
  foreground | fg     app came back (cancel the countdown)
  status              show the lock state
  unlock <password>   answer the password challenge
  back                try to navigate back
  quit                end the session";

/// Run an interactive lock session
pub fn run(
    settings_path: Option<PathBuf>,
    progress: Option<u64>,
    desktop_notifications: bool,
    max_attempts: usize,
) -> Result<()> {
    let settings = Arc::new(open_settings(settings_path)?);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        let mut builder = LockCoordinator::builder(settings.clone())
            .observer(Arc::new(TracingObserver));
        if desktop_notifications {
            builder = builder.observer(Arc::new(DesktopNotifier::default()));
        }
        if let Some(secs) = progress {
            builder = builder.progress_interval(Duration::from_secs(secs));
        }

        let coordinator = lock::install(builder.build()?)?;

        let mut gate =
            Gate::new(coordinator.clone()).with_rate_limit(max_attempts, Duration::from_secs(60));

        run_session(&settings, &mut gate).await
    })
}

async fn run_session(settings: &FileSettings, gate: &mut Gate) -> Result<()> {
    let mut updates = gate.coordinator().subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = *updates.borrow_and_update();
            println!("[lock] {}", state);
        }
    });

    println!("App Lock session (settings: {})", settings.path().display());
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        let command = match SessionCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        if command == SessionCommand::Quit {
            break;
        }

        println!("{}", handle_command(settings, gate, command));
    }

    tracing::debug!("Session ended");
    Ok(())
}

/// Apply one command and describe the result
pub fn handle_command(settings: &FileSettings, gate: &mut Gate, command: SessionCommand) -> String {
    let coordinator = gate.coordinator().clone();

    match command {
        SessionCommand::Background => {
            // Pick up settings changed by another app-lock invocation
            if let Err(e) = settings.reload() {
                tracing::warn!("Keeping previous settings: {:#}", e);
            }
            coordinator.start();
            format!("Backgrounded; lock is {}", coordinator.status())
        }
        SessionCommand::Foreground => {
            coordinator.cancel();
            format!("Foregrounded; lock is {}", coordinator.status())
        }
        SessionCommand::Status => {
            let snapshot = coordinator.snapshot();
            match snapshot.remaining_seconds(chrono::Utc::now()) {
                Some(remaining) => format!(
                    "Lock is {} (arming in {}, generation {})",
                    snapshot.state,
                    format_seconds(remaining),
                    snapshot.generation
                ),
                None => format!(
                    "Lock is {} (generation {})",
                    snapshot.state, snapshot.generation
                ),
            }
        }
        SessionCommand::Unlock(candidate) => match gate.submit(&candidate) {
            GateOutcome::Dismissed => "✓ Unlocked".to_string(),
            GateOutcome::Rejected => "✗ Wrong password".to_string(),
            GateOutcome::NotArmed => format!("Nothing to unlock; lock is {}", coordinator.status()),
            GateOutcome::Throttled { retry_after } => format!(
                "Too many attempts; try again in {}",
                format_seconds(retry_after.as_secs().max(1))
            ),
        },
        SessionCommand::Back => {
            if gate.can_navigate_back() {
                "Navigated back".to_string()
            } else {
                format!("Back navigation blocked while lock is {}", coordinator.status())
            }
        }
        SessionCommand::Help => HELP.to_string(),
        SessionCommand::Quit => "Bye".to_string(),
    }
}
