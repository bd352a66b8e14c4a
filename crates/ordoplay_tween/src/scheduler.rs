// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scheduling capability consumed by [`Timer`](crate::timer::Timer).
//!
//! This module provides:
//! - The [`Scheduler`] trait: frame callbacks, interval callbacks and a clock
//! - [`Clock`] sources: [`SystemClock`] for real time, [`ManualClock`] for tests
//! - [`EventLoop`], a single-threaded host that implements [`Scheduler`]
//!
//! All callbacks run on the thread that drives the loop. Callbacks may
//! register or cancel other callbacks while they run.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Frame rate assumed when an event loop has frames but no configured rate
pub const DEFAULT_FRAME_RATE: f64 = 60.0;

/// Shortest interval period the event loop will honour, in milliseconds
pub const MIN_INTERVAL_MS: f64 = 1.0;

/// Opaque handle of a scheduled callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Get the raw handle value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Platform scheduling primitives.
///
/// Times are milliseconds on the scheduler's own clock.
pub trait Scheduler {
    /// Current time in milliseconds
    fn now(&self) -> f64;

    /// Whether frame-synchronized callbacks are available
    fn supports_frames(&self) -> bool;

    /// Run `callback` once on the next frame
    fn request_frame(&self, callback: Box<dyn FnOnce()>) -> HandleId;

    /// Cancel a pending frame callback
    fn cancel_frame(&self, id: HandleId);

    /// Run `callback` every `period_ms` until cleared
    fn set_interval(&self, callback: Rc<dyn Fn()>, period_ms: f64) -> HandleId;

    /// Cancel an interval callback
    fn clear_interval(&self, id: HandleId);
}

/// Time source for an [`EventLoop`]
pub trait Clock {
    /// Current time in milliseconds
    fn now(&self) -> f64;

    /// Block until `deadline` (milliseconds on this clock) has passed
    fn wait_until(&self, deadline: f64);
}

/// Monotonic wall clock; milliseconds since the clock was created
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock starting at zero now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn wait_until(&self, deadline: f64) {
        let remaining = deadline - self.now();
        if remaining > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(remaining / 1000.0));
        }
    }
}

/// Virtual clock that only moves when told to.
///
/// Waiting on it jumps straight to the deadline.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    /// Create a clock at `now` milliseconds
    pub fn starting_at(now: f64) -> Self {
        Self { now: Cell::new(now) }
    }

    /// Move the clock forward by `ms`
    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms.max(0.0));
    }

    /// Set the clock to `now`; never moves backwards
    pub fn set(&self, now: f64) {
        if now > self.now.get() {
            self.now.set(now);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }

    fn wait_until(&self, deadline: f64) {
        self.set(deadline);
    }
}

/// Event loop configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventLoopConfig {
    /// Frames per second of the frame source, or `None` when the host has
    /// no frame source
    pub frame_rate: Option<f64>,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            frame_rate: Some(DEFAULT_FRAME_RATE),
        }
    }
}

impl EventLoopConfig {
    /// A host without frame-synchronized callbacks
    pub fn without_frames() -> Self {
        Self { frame_rate: None }
    }

    /// Whether frame callbacks are available
    pub fn has_frames(&self) -> bool {
        self.frame_rate.is_some_and(|rate| rate > 0.0)
    }

    /// Frame period in milliseconds
    pub fn frame_period(&self) -> f64 {
        let rate = self
            .frame_rate
            .filter(|rate| *rate > 0.0)
            .unwrap_or(DEFAULT_FRAME_RATE);
        1000.0 / rate
    }
}

struct Interval {
    callback: Rc<dyn Fn()>,
    period: f64,
    next_due: f64,
}

struct LoopState {
    next_id: u64,
    frames: Vec<(HandleId, Box<dyn FnOnce()>)>,
    next_frame_at: f64,
    intervals: IndexMap<HandleId, Interval>,
}

impl LoopState {
    fn allocate_id(&mut self) -> HandleId {
        self.next_id += 1;
        HandleId(self.next_id)
    }
}

/// Single-threaded scheduler host.
///
/// Frame callbacks fire together on a fixed frame grid; interval callbacks
/// fire whenever their period has elapsed. Nothing runs until the loop is
/// driven with [`EventLoop::turn`], [`EventLoop::run_for`] or
/// [`EventLoop::run_until_idle`].
pub struct EventLoop<C: Clock> {
    clock: C,
    config: EventLoopConfig,
    state: RefCell<LoopState>,
}

impl EventLoop<SystemClock> {
    /// Event loop on the system clock
    pub fn system(config: EventLoopConfig) -> Self {
        Self::new(SystemClock::new(), config)
    }
}

impl EventLoop<ManualClock> {
    /// Event loop on a virtual clock starting at zero
    pub fn manual(config: EventLoopConfig) -> Self {
        Self::new(ManualClock::new(), config)
    }
}

impl<C: Clock> EventLoop<C> {
    /// Create an event loop over `clock`
    pub fn new(clock: C, config: EventLoopConfig) -> Self {
        Self {
            clock,
            config,
            state: RefCell::new(LoopState {
                next_id: 0,
                frames: Vec::new(),
                next_frame_at: 0.0,
                intervals: IndexMap::new(),
            }),
        }
    }

    /// The loop's clock
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The loop's configuration
    pub fn config(&self) -> &EventLoopConfig {
        &self.config
    }

    /// Number of pending frame and interval registrations
    pub fn pending(&self) -> usize {
        let state = self.state.borrow();
        state.frames.len() + state.intervals.len()
    }

    /// Whether nothing is scheduled
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Earliest time something is due, if anything is scheduled
    pub fn next_deadline(&self) -> Option<f64> {
        let state = self.state.borrow();
        let frame = (!state.frames.is_empty()).then_some(state.next_frame_at);
        let interval = state
            .intervals
            .values()
            .map(|interval| interval.next_due)
            .reduce(f64::min);

        match (frame, interval) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run every callback that is due now. Returns how many ran.
    pub fn turn(&self) -> usize {
        let now = self.clock.now();
        self.dispatch_frames(now) + self.dispatch_intervals(now)
    }

    /// Drive the loop until nothing is scheduled.
    ///
    /// Never returns while an interval or a self-renewing frame chain is alive.
    pub fn run_until_idle(&self) {
        loop {
            self.turn();
            match self.next_deadline() {
                Some(deadline) => self.clock.wait_until(deadline),
                None => break,
            }
        }
    }

    /// Drive the loop for `ms` milliseconds of clock time
    pub fn run_for(&self, ms: f64) {
        let until = self.clock.now() + ms;
        loop {
            self.turn();
            match self.next_deadline() {
                Some(deadline) if deadline <= until => self.clock.wait_until(deadline),
                _ => {
                    self.clock.wait_until(until);
                    break;
                }
            }
        }
    }

    fn next_frame_after(&self, now: f64) -> f64 {
        let period = self.config.frame_period();
        // Tolerance keeps a tick sitting exactly on the grid from rounding down
        let index = (now / period + 1e-9).floor() + 1.0;
        index * period
    }

    fn dispatch_frames(&self, now: f64) -> usize {
        let batch: Vec<HandleId> = {
            let state = self.state.borrow();
            if state.frames.is_empty() || now < state.next_frame_at {
                return 0;
            }
            state.frames.iter().map(|(id, _)| *id).collect()
        };

        tracing::trace!(now, count = batch.len(), "Dispatching frame callbacks");

        let mut fired = 0;
        for id in batch {
            // Skip callbacks cancelled by an earlier callback in this batch
            let callback = {
                let mut state = self.state.borrow_mut();
                state
                    .frames
                    .iter()
                    .position(|(frame_id, _)| *frame_id == id)
                    .map(|pos| state.frames.remove(pos).1)
            };
            if let Some(callback) = callback {
                callback();
                fired += 1;
            }
        }

        self.state.borrow_mut().next_frame_at = self.next_frame_after(now);
        fired
    }

    fn dispatch_intervals(&self, now: f64) -> usize {
        let mut due: Vec<(HandleId, f64)> = self
            .state
            .borrow()
            .intervals
            .iter()
            .filter(|(_, interval)| interval.next_due <= now)
            .map(|(id, interval)| (*id, interval.next_due))
            .collect();
        due.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut fired = 0;
        for (id, _) in due {
            let callback = {
                let mut state = self.state.borrow_mut();
                let Some(interval) = state.intervals.get_mut(&id) else {
                    continue;
                };
                interval.next_due += interval.period;
                if interval.next_due <= now {
                    interval.next_due = now + interval.period;
                }
                Rc::clone(&interval.callback)
            };
            tracing::trace!(now, handle = %id, "Dispatching interval callback");
            callback();
            fired += 1;
        }
        fired
    }
}

impl<C: Clock> Scheduler for EventLoop<C> {
    fn now(&self) -> f64 {
        self.clock.now()
    }

    fn supports_frames(&self) -> bool {
        self.config.has_frames()
    }

    fn request_frame(&self, callback: Box<dyn FnOnce()>) -> HandleId {
        let now = self.clock.now();
        let next_frame_at = self.next_frame_after(now);
        let mut state = self.state.borrow_mut();
        if state.frames.is_empty() {
            state.next_frame_at = next_frame_at;
        }
        let id = state.allocate_id();
        state.frames.push((id, callback));
        id
    }

    fn cancel_frame(&self, id: HandleId) {
        self.state
            .borrow_mut()
            .frames
            .retain(|(frame_id, _)| *frame_id != id);
    }

    fn set_interval(&self, callback: Rc<dyn Fn()>, period_ms: f64) -> HandleId {
        let period = if period_ms.is_finite() {
            period_ms.max(MIN_INTERVAL_MS)
        } else {
            tracing::warn!(period_ms, "Non-finite interval period, using minimum");
            MIN_INTERVAL_MS
        };
        let next_due = self.clock.now() + period;
        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        state.intervals.insert(
            id,
            Interval {
                callback,
                period,
                next_due,
            },
        );
        id
    }

    fn clear_interval(&self, id: HandleId) {
        self.state.borrow_mut().intervals.shift_remove(&id);
    }
}

impl<C: Clock + fmt::Debug> fmt::Debug for EventLoop<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventLoop")
            .field("clock", &self.clock)
            .field("config", &self.config)
            .field("frames", &state.frames.len())
            .field("intervals", &state.intervals.len())
            .finish()
    }
}
