use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lock coordinator states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    /// No trigger pending
    #[default]
    Idle,
    /// Trigger received, waiting for the lock delay to elapse
    CountingDown,
    /// Password challenge required
    Armed,
    /// Challenge passed, waiting for the trigger to clear
    Unlocked,
}

impl LockState {
    /// Whether a password challenge must be presented
    pub fn challenge_required(self) -> bool {
        self == LockState::Armed
    }

    /// Whether a protected flow is in progress (back-navigation is blocked)
    pub fn is_protecting(self) -> bool {
        matches!(self, LockState::CountingDown | LockState::Armed)
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LockState::Idle => "idle",
            LockState::CountingDown => "counting down",
            LockState::Armed => "armed",
            LockState::Unlocked => "unlocked",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of the coordinator, for display and diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LockSnapshot {
    pub state: LockState,
    pub generation: u64,
    /// Delay captured by the most recent countdown
    pub delay_seconds: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub armed_at: Option<DateTime<Utc>>,
}

impl LockSnapshot {
    /// Seconds left before arming, if a countdown is running
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
        if self.state != LockState::CountingDown {
            return None;
        }

        let started = self.started_at?;
        let elapsed = (now - started).num_seconds().max(0) as u64;
        Some(self.delay_seconds.saturating_sub(elapsed))
    }
}

/// Informational events published to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LockEvent {
    CountdownStarted {
        generation: u64,
        delay_seconds: u64,
    },
    Progress {
        generation: u64,
        remaining_seconds: u64,
    },
    Armed { generation: u64 },
    Cancelled { generation: u64 },
    Unlocked { generation: u64 },
    UnlockRejected { generation: u64 },
    Cleared { generation: u64 },
}

impl LockEvent {
    /// Generation the event was produced in; a higher value is newer
    pub fn generation(&self) -> u64 {
        match self {
            LockEvent::CountdownStarted { generation, .. }
            | LockEvent::Progress { generation, .. }
            | LockEvent::Armed { generation }
            | LockEvent::Cancelled { generation }
            | LockEvent::Unlocked { generation }
            | LockEvent::UnlockRejected { generation }
            | LockEvent::Cleared { generation } => *generation,
        }
    }
}

impl fmt::Display for LockEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockEvent::CountdownStarted { delay_seconds, .. } => {
                write!(f, "Lock countdown started ({}s)", delay_seconds)
            }
            LockEvent::Progress { remaining_seconds, .. } => {
                write!(
                    f,
                    "Locking in {} second{}",
                    remaining_seconds,
                    if *remaining_seconds == 1 { "" } else { "s" }
                )
            }
            LockEvent::Armed { .. } => f.write_str("Password lock armed"),
            LockEvent::Cancelled { .. } => f.write_str("Lock countdown cancelled"),
            LockEvent::Unlocked { .. } => f.write_str("Unlocked"),
            LockEvent::UnlockRejected { .. } => f.write_str("Wrong password"),
            LockEvent::Cleared { .. } => f.write_str("Lock cleared"),
        }
    }
}
