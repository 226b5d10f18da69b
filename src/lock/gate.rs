use std::time::Duration;

use super::auth::RateLimiter;
use super::coordinator::LockCoordinator;

/// Result of submitting a password to the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Password accepted, the gate may close
    Dismissed,
    /// Wrong password, the lock stays armed
    Rejected,
    /// Nothing to unlock right now
    NotArmed,
    /// Too many attempts, try again later
    Throttled { retry_after: Duration },
}

/// Password challenge surface
///
/// Holds no lock state of its own; every decision is read from the
/// coordinator at the moment it's needed.
#[derive(Debug)]
pub struct Gate {
    coordinator: LockCoordinator,
    limiter: Option<RateLimiter>,
}

impl Gate {
    pub fn new(coordinator: LockCoordinator) -> Self {
        Self {
            coordinator,
            limiter: None,
        }
    }

    /// Allow at most `max_attempts` submissions per `window`
    ///
    /// Zero attempts or a zero window removes the limit.
    pub fn with_rate_limit(mut self, max_attempts: usize, window: Duration) -> Self {
        self.limiter = (max_attempts > 0 && !window.is_zero())
            .then(|| RateLimiter::new(max_attempts, window));
        self
    }

    /// Back-navigation is blocked while a protected flow is in progress
    pub fn can_navigate_back(&self) -> bool {
        !self.coordinator.status().is_protecting()
    }

    /// Whether the password field should be shown
    pub fn challenge_required(&self) -> bool {
        self.coordinator.status().challenge_required()
    }

    /// Submit a password; only a successful unlock dismisses the gate
    pub fn submit(&mut self, candidate: &str) -> GateOutcome {
        if !self.challenge_required() {
            return GateOutcome::NotArmed;
        }

        if let Some(limiter) = self.limiter.as_mut() {
            if !limiter.is_allowed() {
                let retry_after = limiter.time_until_allowed().unwrap_or_default();
                tracing::warn!("Password attempts throttled for {:?}", retry_after);
                return GateOutcome::Throttled { retry_after };
            }
        }

        if self.coordinator.unlock(candidate) {
            if let Some(limiter) = self.limiter.as_mut() {
                limiter.reset();
            }
            GateOutcome::Dismissed
        } else if self.challenge_required() {
            GateOutcome::Rejected
        } else {
            // Lock was cleared between the check and the attempt
            GateOutcome::NotArmed
        }
    }

    pub fn coordinator(&self) -> &LockCoordinator {
        &self.coordinator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::auth::{SAMPLE_PASSWORD as PASSWORD, sample_hash};
    use crate::settings::{MemorySettings, SettingValue, keys};
    use std::sync::Arc;

    fn make_gate(delay_seconds: i64) -> Gate {
        let settings = Arc::new(MemorySettings::with_values([
            (keys::LOCK_TIME, SettingValue::Int(delay_seconds)),
            (keys::APP_PASSWORD, SettingValue::from(sample_hash())),
            (keys::APP_PASSWORD_ENABLED, SettingValue::Bool(true)),
        ]));
        Gate::new(LockCoordinator::new(settings).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn back_navigation_blocked_while_protecting() {
        let gate = make_gate(2);
        assert!(gate.can_navigate_back());

        gate.coordinator().start();
        assert!(!gate.can_navigate_back());
        assert!(!gate.challenge_required());

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert!(!gate.can_navigate_back());
        assert!(gate.challenge_required());
    }

    #[tokio::test(start_paused = true)]
    async fn only_correct_password_dismisses() {
        let mut gate = make_gate(0);
        gate.coordinator().start();

        assert_eq!(gate.submit("wrong"), GateOutcome::Rejected);
        assert!(gate.challenge_required());

        assert_eq!(gate.submit(PASSWORD), GateOutcome::Dismissed);
        assert!(gate.can_navigate_back());
        assert!(!gate.challenge_required());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_without_challenge_is_not_armed() {
        let mut gate = make_gate(5);
        assert_eq!(gate.submit(PASSWORD), GateOutcome::NotArmed);

        gate.coordinator().start();
        assert_eq!(gate.submit(PASSWORD), GateOutcome::NotArmed);
        assert!(!gate.can_navigate_back());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_throttles_then_recovers() {
        let mut gate = make_gate(0).with_rate_limit(2, Duration::from_secs(30));
        gate.coordinator().start();

        assert_eq!(gate.submit("wrong1"), GateOutcome::Rejected);
        assert_eq!(gate.submit("wrong2"), GateOutcome::Rejected);
        assert_eq!(
            gate.submit(PASSWORD),
            GateOutcome::Throttled {
                retry_after: Duration::from_secs(30)
            }
        );
        assert!(gate.challenge_required());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(gate.submit(PASSWORD), GateOutcome::Dismissed);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempt_limit_means_unlimited() {
        let mut gate = make_gate(0).with_rate_limit(0, Duration::from_secs(60));
        gate.coordinator().start();

        for _ in 0..3 {
            assert_eq!(gate.submit("wrong"), GateOutcome::Rejected);
        }
        assert_eq!(gate.submit(PASSWORD), GateOutcome::Dismissed);
    }
}
