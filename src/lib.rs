//! # Cronometri - Calendar-Aware Time Counters
//!
//! A Rust library maintaining a collection of independent time counters
//! (stopwatches, countdown timers, elapsed-since-instant counters and
//! countdown-to-instant counters), each of which recomputes a
//! calendar-decomposed value (years/months/days/hours/minutes/seconds)
//! once per second and exposes that value, its sign and its overflow state
//! to observers.
//!
//! ## Counter Kinds
//!
//! | Kind | Modes | Ticks via |
//! |------|-------|-----------|
//! | [`SoloCounter`](counters::solo::SoloCounter) | `Stopwatch`, `Countdown` | its own per-second driver thread, active only while running |
//! | [`InstanceCounter`](counters::instance::InstanceCounter) | `ElapsedFrom`, `CountdownTill` | the shared [`Coordinator`](coordinator::Coordinator) |
//!
//! ## Calendar Arithmetic
//!
//! Raw day counts fold into months and years under one of two
//! day-accounting conventions (see [`calendar::DayAccountingModel`]):
//! `Fixed360` treats every month as 30 days, `Calendar365` uses real
//! Gregorian month lengths with February fixed at 28 and no leap-year
//! adjustment. Normalization is total, rejecting negative components and
//! year counts beyond the representable range, and manual corrections
//! that would overflow are refused without touching the prior state.
//!
//! ## Lockstep Ticking
//!
//! Target-instant counters are ticked by a single coordinator:
//!
//! ```text
//!               ┌────────────────────────────────────────────┐
//!               │           Coordinator (owner thread)       │
//!   add/remove ─►  registry: [c1, c2, ... cK]                │
//!               │                                            │
//!               │  every second: now = clock.now()  (once!)  │
//!               │     ├── worker: c1.recompute(now) ──┐      │
//!               │     ├── worker: c2.recompute(now) ──┤ wait │
//!               │     └── worker: cK.recompute(now) ──┘      │
//!               └────────────────────────────────────────────┘
//! ```
//!
//! Every counter in a tick observes the identical "now", and the tick only
//! completes once all of them have rendezvoused, so registry mutation can
//! never race with an in-flight computation.
//!
//! ## Quick Start
//!
//! ```rust
//! use cronometri::calendar::{ClockDuration, DayAccountingModel};
//! use cronometri::counters::solo::SoloCounter;
//! use cronometri::counters::{CounterId, CounterMode, DisplayStyle};
//! use cronometri::observers::CounterObserver;
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl CounterObserver for Printer {
//!     fn text_changed(&self, id: CounterId, text: &str) {
//!         println!("{id}: {text}");
//!     }
//!     fn zero_crossed(&self, id: CounterId, _now_positive: bool) {
//!         println!("{id}: time's up!");
//!     }
//! }
//!
//! let timer = SoloCounter::new(
//!     CounterMode::Countdown,
//!     None,
//!     Some(ClockDuration::new(0, 3, 0).unwrap()),
//!     DayAccountingModel::Fixed360,
//!     DisplayStyle::default(),
//! )
//! .unwrap();
//!
//! timer.subscribe(Arc::new(Printer));
//! timer.start(); // prints once per second until paused
//! timer.pause();
//! ```
//!
//! ## Persistence
//!
//! The crate never touches the disk; [`snapshot`] provides serde-friendly
//! snapshot types an embedding application can store however it likes.
//! Restoring re-runs construction-time validation and rejects snapshots
//! whose parts disagree (for example an overflow latch on magnitudes that
//! could still advance) rather than partially trusting them.

pub mod calendar;
pub mod clock;
pub mod coordinator;
pub mod counters;
pub mod error;
pub mod observers;
pub mod snapshot;
