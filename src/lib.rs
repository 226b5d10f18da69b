//! App Lock
//!
//! Password lock screen gate. When the app goes to the background a
//! countdown starts; once it runs out the password challenge is armed and
//! must be passed before the app can be used again.

pub mod lock;
pub mod platform;
pub mod settings;

pub use lock::{Gate, GateOutcome, LockCoordinator, LockEvent, LockState};
pub use settings::{FileSettings, MemorySettings, MutableSettings, SettingsStore};
