//! Listener contract between counters and the embedding display layer.
//!
//! Every counter fires three independently-subscribable notifications:
//!
//! | Notification | Fires |
//! |--------------|-------|
//! | `text_changed` | on every tick, with the freshly rendered string |
//! | `zero_crossed` | exactly once per sign transition |
//! | `overflowed` | once, latched, stopwatch/timer counters only |
//!
//! All methods have default no-op bodies, so a subscriber only implements
//! the notifications it cares about.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::counters::CounterId;

/// Observer of a counter's per-tick notifications.
///
/// Implementations must be cheap and non-blocking: notifications are
/// delivered synchronously from the counter's driver (or from the
/// coordinator's tick workers), so a slow observer delays the tick.
pub trait CounterObserver: Send + Sync {
    /// The counter rebuilt its display string.
    fn text_changed(&self, id: CounterId, text: &str) {
        let _ = (id, text);
    }

    /// The counter's signed magnitude changed sign.
    fn zero_crossed(&self, id: CounterId, now_positive: bool) {
        let _ = (id, now_positive);
    }

    /// The counter's year count hit the representable limit. Latched;
    /// fires at most once until the counter is restarted.
    fn overflowed(&self, id: CounterId) {
        let _ = id;
    }
}

/// Subscriber list of one counter.
pub(crate) struct ObserverRegistry {
    observers: RwLock<Vec<Arc<dyn CounterObserver>>>,
}

impl ObserverRegistry {
    pub(crate) fn new() -> Self {
        ObserverRegistry {
            observers: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self, observer: Arc<dyn CounterObserver>) {
        self.observers.write().push(observer);
    }

    pub(crate) fn notify_text_changed(&self, id: CounterId, text: &str) {
        for observer in self.observers.read().iter() {
            observer.text_changed(id, text);
        }
    }

    pub(crate) fn notify_zero_crossed(&self, id: CounterId, now_positive: bool) {
        for observer in self.observers.read().iter() {
            observer.zero_crossed(id, now_positive);
        }
    }

    pub(crate) fn notify_overflowed(&self, id: CounterId) {
        for observer in self.observers.read().iter() {
            observer.overflowed(id);
        }
    }
}

#[cfg(test)]
pub(crate) mod recording {
    //! Recording observer shared by the unit tests.

    use super::*;
    use parking_lot::Mutex;

    /// Records every notification it receives.
    #[derive(Default)]
    pub(crate) struct RecordingObserver {
        texts: Mutex<Vec<(CounterId, String)>>,
        crossings: Mutex<Vec<(CounterId, bool)>>,
        overflows: Mutex<Vec<CounterId>>,
    }

    impl RecordingObserver {
        pub(crate) fn texts(&self) -> Vec<(CounterId, String)> {
            self.texts.lock().clone()
        }

        pub(crate) fn last_text(&self) -> Option<String> {
            self.texts.lock().last().map(|(_, t)| t.clone())
        }

        pub(crate) fn zero_crossings(&self) -> usize {
            self.crossings.lock().len()
        }

        pub(crate) fn last_crossing_sign(&self) -> Option<bool> {
            self.crossings.lock().last().map(|(_, p)| *p)
        }

        pub(crate) fn overflow_count(&self) -> usize {
            self.overflows.lock().len()
        }
    }

    impl CounterObserver for RecordingObserver {
        fn text_changed(&self, id: CounterId, text: &str) {
            self.texts.lock().push((id, text.to_string()));
        }

        fn zero_crossed(&self, id: CounterId, now_positive: bool) {
            self.crossings.lock().push((id, now_positive));
        }

        fn overflowed(&self, id: CounterId) {
            self.overflows.lock().push(id);
        }
    }
}
