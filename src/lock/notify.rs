use tracing::{debug, info, warn};

use super::state::LockEvent;

/// Receives informational lock events
///
/// Observers have no control over the state machine. They're invoked after
/// the coordinator has released its lock, so they may query it freely.
///
/// Events from concurrent `start`/`cancel` calls can arrive out of order.
/// Use `LockEvent::generation` to tell which is newer; `status()` is always
/// current.
pub trait LockObserver: Send + Sync {
    fn notify(&self, event: &LockEvent);
}

/// Logs every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LockObserver for TracingObserver {
    fn notify(&self, event: &LockEvent) {
        match event {
            LockEvent::Progress { generation, remaining_seconds } => {
                debug!(generation, remaining_seconds, "{}", event);
            }
            LockEvent::UnlockRejected { generation } => {
                warn!(generation, "{}", event);
            }
            _ => info!(event = ?event, "{}", event),
        }
    }
}

/// Shows lock events as desktop notifications
///
/// Only the countdown start and arming are surfaced; the notifier process is
/// spawned and never waited on.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    title: String,
}

impl DesktopNotifier {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }

    fn send_system_notification(&self, message: &str) -> std::io::Result<()> {
        #[cfg(target_os = "linux")]
        {
            use std::process::Command;
            let child = Command::new("notify-send")
                .arg(&self.title)
                .arg(message)
                .arg("--icon=dialog-password")
                .spawn()?;
            reap(child);
        }

        #[cfg(target_os = "macos")]
        {
            use std::process::Command;
            let script = format!(
                "display notification \"{}\" with title \"{}\"",
                message.replace('"', "\\\""),
                self.title.replace('"', "\\\"")
            );
            let child = Command::new("osascript").arg("-e").arg(&script).spawn()?;
            reap(child);
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            // No native toast support without extra dependencies
            info!("Notification: {} - {}", self.title, message);
        }

        Ok(())
    }
}

/// Wait for a notifier process off-thread so it doesn't linger as a zombie
#[cfg(any(target_os = "linux", target_os = "macos"))]
fn reap(mut child: std::process::Child) {
    std::thread::spawn(move || {
        let _ = child.wait();
    });
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new("App Lock")
    }
}

impl LockObserver for DesktopNotifier {
    fn notify(&self, event: &LockEvent) {
        if !matches!(
            event,
            LockEvent::CountdownStarted { .. } | LockEvent::Armed { .. }
        ) {
            return;
        }

        if let Err(e) = self.send_system_notification(&event.to_string()) {
            warn!("Failed to show desktop notification: {}", e);
        }
    }
}
