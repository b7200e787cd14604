//! Lockstep ticking of a dynamic set of target-instant counters.
//!
//! The coordinator is a single owner thread that holds the registry of
//! [`InstanceCounter`]s exclusively and talks to the outside world over a
//! command channel, so registry mutation can never race with an in-flight
//! tick. While the registry is non-empty the owner ticks once per second:
//! it samples "now" exactly once from the injected [`Clock`], dispatches
//! one recompute task per registered counter, and rendezvouses on a
//! [`WaitGroup`] sized to the registry, so a tick only completes when the
//! slowest counter has finished. An empty registry stops the cadence
//! entirely; the owner just blocks on the next command.
//!
//! # Examples
//!
//! ```rust,no_run
//! use chrono::DateTime;
//! use cronometri::coordinator::Coordinator;
//! use cronometri::counters::instance::InstanceCounter;
//! use cronometri::counters::{CounterMode, DisplayStyle};
//!
//! let coordinator = Coordinator::new();
//! let target = DateTime::parse_from_rfc3339("2031-01-01T00:00:00+01:00").unwrap();
//! let counter =
//!     InstanceCounter::new(CounterMode::CountdownTill, target, DisplayStyle::default())
//!         .unwrap();
//!
//! coordinator.add(counter.clone());
//! // ... the counter now recomputes once per second ...
//! coordinator.remove(counter.id());
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_utils::sync::WaitGroup;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::counters::instance::InstanceCounter;
use crate::counters::CounterId;

/// One cadence period.
const CADENCE: Duration = Duration::from_secs(1);

enum Command {
    Add(Vec<Arc<InstanceCounter>>),
    Remove(Vec<CounterId>),
    Retain(Vec<CounterId>),
    Clear,
    /// Run one tick immediately; the ack is sent once every counter in the
    /// tick has finished recomputing.
    TickNow(Sender<()>),
    Shutdown,
}

/// Handle to the coordinator's owner thread.
///
/// Cloneable operations all go through the command channel; dropping the
/// handle shuts the owner thread down after the in-flight tick, if any,
/// has completed.
pub struct Coordinator {
    tx: Sender<Command>,
    registered: Arc<AtomicUsize>,
    owner: Option<JoinHandle<()>>,
}

impl Coordinator {
    /// Creates a coordinator ticking against the local system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a coordinator with an injected time source.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let (tx, rx) = mpsc::channel();
        let registered = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&registered);
        let owner = std::thread::spawn(move || owner_loop(rx, clock, count));
        Coordinator {
            tx,
            registered,
            owner: Some(owner),
        }
    }

    /// Registers one counter; (re)starts the cadence if the registry was
    /// empty.
    pub fn add(&self, counter: Arc<InstanceCounter>) {
        self.add_group(vec![counter]);
    }

    /// Registers a group of counters in one registry mutation.
    pub fn add_group(&self, counters: Vec<Arc<InstanceCounter>>) {
        if counters.is_empty() {
            return;
        }
        let _ = self.tx.send(Command::Add(counters));
    }

    /// Removes one counter; stops the cadence if the registry empties.
    pub fn remove(&self, id: CounterId) {
        self.remove_group(vec![id]);
    }

    /// Removes a group of counters in one registry mutation.
    pub fn remove_group(&self, ids: Vec<CounterId>) {
        if ids.is_empty() {
            return;
        }
        let _ = self.tx.send(Command::Remove(ids));
    }

    /// Keeps only the listed counters, dropping every other registrant.
    pub fn retain_group(&self, keep: Vec<CounterId>) {
        let _ = self.tx.send(Command::Retain(keep));
    }

    /// Empties the registry and stops the cadence.
    pub fn clear(&self) {
        let _ = self.tx.send(Command::Clear);
    }

    /// Number of currently registered counters.
    pub fn len(&self) -> usize {
        self.registered.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forces one immediate tick and blocks until it has fully completed,
    /// i.e. every registered counter has recomputed against the same
    /// sampled "now".
    pub fn tick_now(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.tx.send(Command::TickNow(ack_tx)).is_ok() {
            // Bounded wait: a wedged owner must not hang the caller.
            if ack_rx.recv_timeout(Duration::from_secs(5)).is_err() {
                warn!("forced tick was not acknowledged");
            }
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(owner) = self.owner.take() {
            let _ = owner.join();
        }
    }
}

fn owner_loop(rx: Receiver<Command>, clock: Arc<dyn Clock>, registered: Arc<AtomicUsize>) {
    let mut registry: Vec<Arc<InstanceCounter>> = Vec::new();
    let mut deadline = Instant::now() + CADENCE;

    loop {
        let command = if registry.is_empty() {
            // Cadence stopped; nothing to tick until a counter arrives.
            match rx.recv() {
                Ok(command) => Some(command),
                Err(_) => return,
            }
        } else {
            match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("command channel disconnected, coordinator stopping");
                    return;
                }
            }
        };

        match command {
            Some(Command::Add(counters)) => {
                let was_empty = registry.is_empty();
                for counter in counters {
                    if !registry.iter().any(|c| c.id() == counter.id()) {
                        debug!(id = %counter.id(), "counter registered");
                        registry.push(counter);
                    }
                }
                registered.store(registry.len(), Ordering::Release);
                if was_empty && !registry.is_empty() {
                    deadline = Instant::now() + CADENCE;
                }
            }
            Some(Command::Remove(ids)) => {
                registry.retain(|c| !ids.contains(&c.id()));
                registered.store(registry.len(), Ordering::Release);
            }
            Some(Command::Retain(keep)) => {
                registry.retain(|c| keep.contains(&c.id()));
                registered.store(registry.len(), Ordering::Release);
            }
            Some(Command::Clear) => {
                registry.clear();
                registered.store(0, Ordering::Release);
            }
            Some(Command::TickNow(ack)) => {
                run_tick(&registry, clock.as_ref());
                let _ = ack.send(());
                deadline = Instant::now() + CADENCE;
            }
            Some(Command::Shutdown) => {
                debug!("coordinator shutting down");
                return;
            }
            None => {
                run_tick(&registry, clock.as_ref());
                deadline += CADENCE;
            }
        }
    }
}

/// One cadence tick: every counter recomputes against the identical "now",
/// and the tick completes only once all of them have rendezvoused.
fn run_tick(registry: &[Arc<InstanceCounter>], clock: &dyn Clock) {
    if registry.is_empty() {
        return;
    }
    let now = clock.now();
    let rendezvous = WaitGroup::new();
    std::thread::scope(|scope| {
        for counter in registry {
            let worker = rendezvous.clone();
            scope.spawn(move || {
                counter.recompute(now);
                drop(worker);
            });
        }
        rendezvous.wait();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::counters::{CounterMode, DisplayStyle};
    use crate::observers::recording::RecordingObserver;
    use chrono::{DateTime, FixedOffset};
    use parking_lot::Mutex;

    fn instant(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn till(target: &str) -> Arc<InstanceCounter> {
        InstanceCounter::new(
            CounterMode::CountdownTill,
            instant(target),
            DisplayStyle::default(),
        )
        .unwrap()
    }

    /// Clock that steps forward one hour on every sample, exposing any
    /// double-sampling within a tick.
    struct SteppingClock {
        now: Mutex<DateTime<FixedOffset>>,
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<FixedOffset> {
            let mut now = self.now.lock();
            let sampled = *now;
            *now = sampled + chrono::Duration::hours(1);
            sampled
        }
    }

    #[test]
    fn test_tick_uses_one_now_for_all_counters() {
        let clock = Arc::new(SteppingClock {
            now: Mutex::new(instant("2030-01-01T00:00:00+00:00")),
        });
        let coordinator = Coordinator::with_clock(clock);

        let counters: Vec<_> = (0..8).map(|_| till("2030-06-01T00:00:00+00:00")).collect();
        coordinator.add_group(counters.clone());
        coordinator.tick_now();

        // The stepping clock makes any second sample differ by an hour, so
        // identical magnitudes prove a single shared sample.
        let first = counters[0].magnitudes();
        for counter in &counters {
            assert_eq!(counter.magnitudes(), first);
        }
    }

    #[test]
    fn test_tick_completes_only_after_all_recomputed() {
        let clock = Arc::new(ManualClock::new(instant("2030-01-01T00:00:00+00:00")));
        let coordinator = Coordinator::with_clock(clock);

        let counters: Vec<_> = (0..5).map(|_| till("2030-06-01T00:00:00+00:00")).collect();
        let observers: Vec<_> = counters
            .iter()
            .map(|counter| {
                let observer = Arc::new(RecordingObserver::default());
                counter.subscribe(observer.clone());
                observer
            })
            .collect();

        coordinator.add_group(counters);
        coordinator.tick_now();

        // tick_now returned, so every counter must have published.
        for observer in &observers {
            assert_eq!(observer.texts().len(), 1);
        }
    }

    #[test]
    fn test_add_and_remove_track_registry_size() {
        let clock = Arc::new(ManualClock::new(instant("2030-01-01T00:00:00+00:00")));
        let coordinator = Coordinator::with_clock(clock);
        assert!(coordinator.is_empty());

        let a = till("2030-06-01T00:00:00+00:00");
        let b = till("2030-07-01T00:00:00+00:00");
        coordinator.add(a.clone());
        coordinator.add(b.clone());
        // Re-adding the same counter is a no-op.
        coordinator.add(a.clone());
        coordinator.tick_now();
        assert_eq!(coordinator.len(), 2);

        coordinator.remove(a.id());
        coordinator.tick_now();
        assert_eq!(coordinator.len(), 1);

        coordinator.clear();
        coordinator.tick_now();
        assert!(coordinator.is_empty());
    }

    #[test]
    fn test_retain_group_keeps_only_listed() {
        let clock = Arc::new(ManualClock::new(instant("2030-01-01T00:00:00+00:00")));
        let coordinator = Coordinator::with_clock(clock);

        let counters: Vec<_> = (0..4).map(|_| till("2030-06-01T00:00:00+00:00")).collect();
        coordinator.add_group(counters.clone());
        coordinator.retain_group(vec![counters[1].id(), counters[3].id()]);
        coordinator.tick_now();
        assert_eq!(coordinator.len(), 2);
    }

    #[test]
    fn test_removed_counter_no_longer_recomputes() {
        let clock = Arc::new(ManualClock::new(instant("2030-01-01T00:00:00+00:00")));
        let coordinator = Coordinator::with_clock(clock);

        let counter = till("2030-06-01T00:00:00+00:00");
        let observer = Arc::new(RecordingObserver::default());
        counter.subscribe(observer.clone());

        coordinator.add(counter.clone());
        coordinator.tick_now();
        assert_eq!(observer.texts().len(), 1);

        coordinator.remove(counter.id());
        coordinator.tick_now();
        assert_eq!(observer.texts().len(), 1);
    }

    #[test]
    fn test_cadence_ticks_in_real_time() {
        let coordinator = Coordinator::new();
        let counter = till("2050-01-01T00:00:00+00:00");
        let observer = Arc::new(RecordingObserver::default());
        counter.subscribe(observer.clone());

        coordinator.add(counter);
        std::thread::sleep(Duration::from_millis(2500));
        let ticks = observer.texts().len();
        assert!((1..=4).contains(&ticks), "expected 1..=4 ticks, got {ticks}");
    }

    #[test]
    fn test_drop_shuts_the_owner_down() {
        let clock = Arc::new(ManualClock::new(instant("2030-01-01T00:00:00+00:00")));
        let coordinator = Coordinator::with_clock(clock);
        coordinator.add(till("2030-06-01T00:00:00+00:00"));
        drop(coordinator);
    }
}
