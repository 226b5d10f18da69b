/// Lock screen gate
///
/// This module provides:
/// - The background countdown coordinator that arms the password challenge
/// - The gate that consults it before unlocking or navigating back
/// - Observers for informational lock events
/// - The process-wide coordinator instance

pub mod auth;
pub mod coordinator;
pub mod gate;
pub mod notify;
pub mod state;

use anyhow::Result;
use std::sync::OnceLock;

pub use auth::RateLimiter;
pub use coordinator::{LockCoordinator, LockCoordinatorBuilder};
pub use gate::{Gate, GateOutcome};
pub use notify::{DesktopNotifier, LockObserver, TracingObserver};
pub use state::{LockEvent, LockSnapshot, LockState};

static GLOBAL: OnceLock<LockCoordinator> = OnceLock::new();

/// Install the process-wide coordinator
///
/// Only one coordinator can be installed for the life of the process.
pub fn install(coordinator: LockCoordinator) -> Result<&'static LockCoordinator> {
    let mut installed = false;
    let global = GLOBAL.get_or_init(|| {
        installed = true;
        coordinator
    });

    if !installed {
        anyhow::bail!("A lock coordinator is already installed");
    }

    Ok(global)
}

/// The process-wide coordinator, if one has been installed
pub fn global() -> Option<&'static LockCoordinator> {
    GLOBAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettings;
    use std::sync::Arc;

    #[tokio::test]
    async fn install_happens_once() {
        let first = LockCoordinator::new(Arc::new(MemorySettings::new())).unwrap();
        let second = LockCoordinator::new(Arc::new(MemorySettings::new())).unwrap();

        let installed = install(first).unwrap();
        assert!(std::ptr::eq(installed, global().unwrap()));

        assert!(install(second).is_err());
        assert_eq!(global().unwrap().status(), LockState::Idle);
    }
}
