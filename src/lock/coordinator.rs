use anyhow::{Context, Result};
use chrono::Utc;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tracing::{debug, info, warn};

use super::auth::verify_password;
use super::notify::LockObserver;
use super::state::{LockEvent, LockSnapshot, LockState};
use crate::settings::{self, SettingsStore};

/// Background countdown coordinator
///
/// Owns the lock state machine. `start`, `cancel`, `status` and `unlock` are
/// synchronous and never wait on the countdown; the countdown itself runs as
/// a task on the tokio runtime the coordinator was built with.
///
/// Every `start` and `cancel` bumps the generation. A countdown only commits
/// `Armed` if the generation it was started in is still current, checked
/// under the same mutex that serializes all state changes.
#[derive(Clone)]
pub struct LockCoordinator {
    shared: Arc<Shared>,
}

struct Shared {
    settings: Arc<dyn SettingsStore>,
    observers: Vec<Arc<dyn LockObserver>>,
    runtime: Handle,
    progress_interval: Option<Duration>,
    machine: Mutex<Machine>,
    status: watch::Sender<LockState>,
    pending: AtomicUsize,
}

#[derive(Default)]
struct Machine {
    state: LockState,
    generation: u64,
    delay_seconds: u64,
    started_at: Option<chrono::DateTime<Utc>>,
    armed_at: Option<chrono::DateTime<Utc>>,
    /// Dropping or firing this wakes the live countdown
    release: Option<oneshot::Sender<()>>,
}

impl Machine {
    /// Wake the live countdown, if any
    fn release_countdown(&mut self) -> bool {
        match self.release.take() {
            Some(release) => {
                let _ = release.send(());
                true
            }
            None => false,
        }
    }
}

/// Builder for `LockCoordinator`
pub struct LockCoordinatorBuilder {
    settings: Arc<dyn SettingsStore>,
    observers: Vec<Arc<dyn LockObserver>>,
    runtime: Option<Handle>,
    progress_interval: Option<Duration>,
}

impl LockCoordinatorBuilder {
    /// Add an observer for lock events
    pub fn observer(mut self, observer: Arc<dyn LockObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Emit `Progress` events at this interval while counting down
    pub fn progress_interval(mut self, every: Duration) -> Self {
        self.progress_interval = (!every.is_zero()).then_some(every);
        self
    }

    /// Run countdowns on this runtime instead of the current one
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<LockCoordinator> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current()
                .context("Lock coordinator must be built inside a tokio runtime")?,
        };

        let (status, _) = watch::channel(LockState::Idle);

        Ok(LockCoordinator {
            shared: Arc::new(Shared {
                settings: self.settings,
                observers: self.observers,
                runtime,
                progress_interval: self.progress_interval,
                machine: Mutex::new(Machine::default()),
                status,
                pending: AtomicUsize::new(0),
            }),
        })
    }
}

impl LockCoordinator {
    pub fn builder(settings: Arc<dyn SettingsStore>) -> LockCoordinatorBuilder {
        LockCoordinatorBuilder {
            settings,
            observers: Vec::new(),
            runtime: None,
            progress_interval: None,
        }
    }

    /// Create a coordinator on the current tokio runtime with no observers
    pub fn new(settings: Arc<dyn SettingsStore>) -> Result<Self> {
        Self::builder(settings).build()
    }

    /// Begin (or restart) the lock countdown
    ///
    /// The delay is read from settings now and not re-read while counting
    /// down. A zero delay arms immediately. An armed lock stays armed. If
    /// password protection is inactive the coordinator goes to `Idle`.
    pub fn start(&self) {
        let shared = &self.shared;
        let active = settings::protection_active(&*shared.settings);
        let delay_seconds = settings::lock_delay_seconds(&*shared.settings);

        let event = {
            let mut machine = shared.machine();
            machine.generation += 1;
            let generation = machine.generation;

            if machine.release_countdown() {
                debug!(generation, "Superseding running countdown");
            }

            if !active {
                debug!(generation, "Password protection inactive, not arming");
                machine.armed_at = None;
                shared.transition(&mut machine, LockState::Idle);
                None
            } else if machine.state == LockState::Armed {
                debug!(generation, "Already armed, challenge stays in place");
                None
            } else if delay_seconds == 0 {
                let now = Utc::now();
                machine.delay_seconds = 0;
                machine.started_at = Some(now);
                machine.armed_at = Some(now);
                shared.transition(&mut machine, LockState::Armed);
                Some(LockEvent::Armed { generation })
            } else {
                let delay = Duration::from_secs(delay_seconds);
                let deadline = Instant::now() + delay;
                let (release, released) = oneshot::channel();

                machine.release = Some(release);
                machine.delay_seconds = delay_seconds;
                machine.started_at = Some(Utc::now());
                machine.armed_at = None;
                shared.transition(&mut machine, LockState::CountingDown);

                let guard = PendingGuard::acquire(shared);
                shared.runtime.spawn(run_countdown(
                    Arc::clone(shared),
                    generation,
                    deadline,
                    released,
                    guard,
                ));

                Some(LockEvent::CountdownStarted {
                    generation,
                    delay_seconds,
                })
            }
        };

        shared.publish(event);
    }

    /// Abort the countdown, or clear an unlocked lock
    ///
    /// Returns without waiting for the countdown task to unwind. An armed
    /// lock is only dropped here if password protection has been switched
    /// off in the meantime; otherwise it needs `unlock`.
    pub fn cancel(&self) {
        let shared = &self.shared;
        let active = settings::protection_active(&*shared.settings);

        let event = {
            let mut machine = shared.machine();
            machine.generation += 1;
            let generation = machine.generation;
            machine.release_countdown();

            match machine.state {
                LockState::CountingDown => {
                    shared.transition(&mut machine, LockState::Idle);
                    Some(LockEvent::Cancelled { generation })
                }
                LockState::Unlocked => {
                    shared.transition(&mut machine, LockState::Idle);
                    Some(LockEvent::Cleared { generation })
                }
                LockState::Armed if !active => {
                    machine.armed_at = None;
                    shared.transition(&mut machine, LockState::Idle);
                    Some(LockEvent::Cleared { generation })
                }
                LockState::Armed => {
                    debug!(generation, "Cancel while armed, challenge stays in place");
                    None
                }
                LockState::Idle => None,
            }
        };

        shared.publish(event);
    }

    /// Current state; never blocks
    pub fn status(&self) -> LockState {
        *self.shared.status.borrow()
    }

    /// Receive every published state change
    pub fn subscribe(&self) -> watch::Receiver<LockState> {
        self.shared.status.subscribe()
    }

    /// Try the password against the stored hash
    ///
    /// Only meaningful while armed; in any other state this returns `false`
    /// and changes nothing. The hash is checked without holding the machine
    /// lock, so the state is checked again before committing `Unlocked`.
    pub fn unlock(&self, candidate: &str) -> bool {
        let shared = &self.shared;

        let generation = {
            let machine = shared.machine();
            if machine.state != LockState::Armed {
                debug!(state = %machine.state, "Unlock attempted while not armed");
                return false;
            }
            machine.generation
        };

        let Some(stored) = settings::configured_password(&*shared.settings) else {
            warn!(generation, "Armed without a configured password");
            return false;
        };

        let matches = match verify_password(candidate, &stored) {
            Ok(matches) => matches,
            Err(e) => {
                warn!(generation, "Stored app password is unreadable: {:#}", e);
                false
            }
        };

        let event = {
            let mut machine = shared.machine();
            if machine.state != LockState::Armed {
                debug!(state = %machine.state, "Lock left Armed during unlock");
                return false;
            }

            let generation = machine.generation;
            if matches {
                shared.transition(&mut machine, LockState::Unlocked);
                LockEvent::Unlocked { generation }
            } else {
                LockEvent::UnlockRejected { generation }
            }
        };

        shared.publish(Some(event));
        matches
    }

    /// Full view of the state machine
    pub fn snapshot(&self) -> LockSnapshot {
        let machine = self.shared.machine();
        LockSnapshot {
            state: machine.state,
            generation: machine.generation,
            delay_seconds: machine.delay_seconds,
            started_at: machine.started_at,
            armed_at: machine.armed_at,
        }
    }

    pub fn generation(&self) -> u64 {
        self.shared.machine().generation
    }

    /// Countdown tasks that haven't finished unwinding yet
    pub fn pending_countdowns(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for LockCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockCoordinator")
            .field("snapshot", &self.snapshot())
            .field("observers", &self.shared.observers.len())
            .field("progress_interval", &self.shared.progress_interval)
            .finish()
    }
}

impl Shared {
    fn machine(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change state and publish it; caller holds the machine lock
    fn transition(&self, machine: &mut Machine, next: LockState) {
        if machine.state != next {
            debug!(
                generation = machine.generation,
                "Lock state {} -> {}", machine.state, next
            );
        }
        machine.state = next;
        self.status.send_replace(next);
    }

    /// Notify observers; never called with the machine lock held
    fn publish(&self, event: Option<LockEvent>) {
        let Some(event) = event else {
            return;
        };

        for observer in &self.observers {
            observer.notify(&event);
        }
    }

    /// Countdown for `generation` ran to its deadline
    fn complete(&self, generation: u64) {
        {
            let mut machine = self.machine();
            if machine.generation != generation || machine.state != LockState::CountingDown {
                debug!(
                    generation,
                    current = machine.generation,
                    "Discarding stale countdown completion"
                );
                return;
            }

            machine.release = None;
            machine.armed_at = Some(Utc::now());
            self.transition(&mut machine, LockState::Armed);
        }

        info!(generation, "Lock countdown finished");
        self.publish(Some(LockEvent::Armed { generation }));
    }

    fn report_progress(&self, generation: u64, remaining: Duration) {
        {
            let machine = self.machine();
            if machine.generation != generation {
                return;
            }
        }

        let remaining_seconds = (remaining.as_millis() as u64).div_ceil(1000);
        self.publish(Some(LockEvent::Progress {
            generation,
            remaining_seconds,
        }));
    }
}

/// Counts a countdown task as pending until the task (or its future) drops
struct PendingGuard(Arc<Shared>);

impl PendingGuard {
    fn acquire(shared: &Arc<Shared>) -> Self {
        shared.pending.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(shared))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Wait until `deadline` or until released, then try to arm
async fn run_countdown(
    shared: Arc<Shared>,
    generation: u64,
    deadline: Instant,
    mut released: oneshot::Receiver<()>,
    _pending: PendingGuard,
) {
    let was_released = match shared.progress_interval {
        None => tokio::select! {
            _ = &mut released => true,
            _ = sleep_until(deadline) => false,
        },
        Some(every) => {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut released => break true,
                    _ = sleep_until(deadline) => break false,
                    tick = ticker.tick() => {
                        let remaining = deadline.saturating_duration_since(tick);
                        if !remaining.is_zero() {
                            shared.report_progress(generation, remaining);
                        }
                    }
                }
            }
        }
    };

    if was_released {
        debug!(generation, "Countdown released early");
        return;
    }

    shared.complete(generation);
}
