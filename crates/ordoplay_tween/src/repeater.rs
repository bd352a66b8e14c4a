// SPDX-License-Identifier: MIT OR Apache-2.0
//! Repeated transition runs.
//!
//! A [`Repeater`] owns one [`Transition`] and restarts it every time a run
//! completes, until its repeat budget is spent:
//! - `Normal` mode replays the same start and target
//! - `Alternate` mode swaps start and target on every repeat
//!
//! An explicit stop ends the chain without counting a repeat.

use crate::config::{RepeatMode, DEFAULT_REPEAT_COUNT, DEFAULT_REPEAT_MODE};
use crate::emitter::{Callback, Emitter, Subscription};
use crate::transition::{Transition, TransitionOptions, WorkStatus};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Which way the current run goes relative to the first one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RepeatDirection {
    /// Same direction as the first run
    #[default]
    Forward,
    /// Reversed
    Backward,
}

impl RepeatDirection {
    /// The opposite direction
    pub fn flipped(&self) -> Self {
        match self {
            RepeatDirection::Forward => RepeatDirection::Backward,
            RepeatDirection::Backward => RepeatDirection::Forward,
        }
    }
}

/// Lifecycle events of a repeater
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepeaterEvent {
    /// The sequence began
    Started,
    /// The sequence was paused
    Paused,
    /// The sequence was resumed
    Resumed,
    /// The sequence was stopped
    Stopped,
    /// A run completed
    Repeated,
    /// The repeat budget was spent
    Completed,
}

/// Payload of repeater notifications
#[derive(Debug, Clone)]
pub struct RepeatContext {
    /// The repeater
    pub repeater: Repeater,
    /// The wrapped transition
    pub transition: Transition,
    /// Completed runs so far
    pub count: u32,
}

/// Options of a repeater
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatOptions {
    /// Number of runs; non-positive repeats forever
    pub count: Option<i64>,
    /// Relation between consecutive runs
    pub mode: Option<RepeatMode>,
    /// Called when the sequence starts
    #[serde(skip)]
    pub on_started: Option<Callback<RepeatContext>>,
    /// Called on pause
    #[serde(skip)]
    pub on_paused: Option<Callback<RepeatContext>>,
    /// Called on resume
    #[serde(skip)]
    pub on_resumed: Option<Callback<RepeatContext>>,
    /// Called on stop
    #[serde(skip)]
    pub on_stopped: Option<Callback<RepeatContext>>,
    /// Called after every completed run
    #[serde(skip)]
    pub on_repeated: Option<Callback<RepeatContext>>,
    /// Called once the budget is spent
    #[serde(skip)]
    pub on_completed: Option<Callback<RepeatContext>>,
}

impl RepeatOptions {
    /// Options for `count` runs in `mode`
    pub fn new(count: i64, mode: RepeatMode) -> Self {
        Self {
            count: Some(count),
            mode: Some(mode),
            ..Default::default()
        }
    }

    /// Set the started callback
    pub fn with_started(mut self, f: impl Fn(&RepeatContext) + 'static) -> Self {
        self.on_started = Some(Callback::new(f));
        self
    }

    /// Set the paused callback
    pub fn with_paused(mut self, f: impl Fn(&RepeatContext) + 'static) -> Self {
        self.on_paused = Some(Callback::new(f));
        self
    }

    /// Set the resumed callback
    pub fn with_resumed(mut self, f: impl Fn(&RepeatContext) + 'static) -> Self {
        self.on_resumed = Some(Callback::new(f));
        self
    }

    /// Set the stopped callback
    pub fn with_stopped(mut self, f: impl Fn(&RepeatContext) + 'static) -> Self {
        self.on_stopped = Some(Callback::new(f));
        self
    }

    /// Set the repeated callback
    pub fn with_repeated(mut self, f: impl Fn(&RepeatContext) + 'static) -> Self {
        self.on_repeated = Some(Callback::new(f));
        self
    }

    /// Set the completed callback
    pub fn with_completed(mut self, f: impl Fn(&RepeatContext) + 'static) -> Self {
        self.on_completed = Some(Callback::new(f));
        self
    }

    /// Shallow merge: every field set in `other` replaces the stored one
    pub fn merge(&mut self, other: RepeatOptions) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.count, other.count);
        take(&mut self.mode, other.mode);
        take(&mut self.on_started, other.on_started);
        take(&mut self.on_paused, other.on_paused);
        take(&mut self.on_resumed, other.on_resumed);
        take(&mut self.on_stopped, other.on_stopped);
        take(&mut self.on_repeated, other.on_repeated);
        take(&mut self.on_completed, other.on_completed);
    }
}

struct RepeaterState {
    options: RepeatOptions,
    status: WorkStatus,
    counts: u32,
    direction: RepeatDirection,
    // Bumped by every start and stop; completions from older sequences are dropped
    sequence: u64,
    // Start and target of the first run of the current sequence
    endpoints: Option<(f64, f64)>,
    completer: Option<Callback<Transition>>,
}

impl RepeaterState {
    fn reset(&mut self) {
        self.status = WorkStatus::Free;
        self.counts = 0;
        self.direction = RepeatDirection::Forward;
    }
}

struct RepeaterInner {
    transition: Transition,
    emitter: Emitter<RepeaterEvent, RepeatContext>,
    state: RefCell<RepeaterState>,
}

/// Restarts a transition until a repeat budget is spent.
///
/// Cloning yields another handle to the same repeater.
#[derive(Clone)]
pub struct Repeater {
    inner: Rc<RepeaterInner>,
}

impl Repeater {
    /// Wrap `transition`; the repeater owns it from now on
    pub fn new(transition: Transition, options: RepeatOptions) -> Self {
        Self {
            inner: Rc::new(RepeaterInner {
                transition,
                emitter: Emitter::new(),
                state: RefCell::new(RepeaterState {
                    options,
                    status: WorkStatus::Free,
                    counts: 0,
                    direction: RepeatDirection::Forward,
                    sequence: 0,
                    endpoints: None,
                    completer: None,
                }),
            }),
        }
    }

    /// The wrapped transition
    pub fn transition(&self) -> &Transition {
        &self.inner.transition
    }

    /// Merge `options` (if any) onto the stored options and return the result
    pub fn options(&self, options: Option<RepeatOptions>) -> RepeatOptions {
        let mut state = self.inner.state.borrow_mut();
        if let Some(options) = options {
            state.options.merge(options);
        }
        state.options.clone()
    }

    /// Current run state
    pub fn status(&self) -> WorkStatus {
        self.inner.state.borrow().status
    }

    /// Completed runs since the last start
    pub fn counts(&self) -> u32 {
        self.inner.state.borrow().counts
    }

    /// Direction of the current run
    pub fn direction(&self) -> RepeatDirection {
        self.inner.state.borrow().direction
    }

    /// Whether the current run goes the same way as the first one
    pub fn is_forward(&self) -> bool {
        self.direction() == RepeatDirection::Forward
    }

    /// Start a fresh sequence, merging `options` first.
    ///
    /// A repeater that is not free is stopped before the new sequence begins.
    /// The counter and direction always start over, and the first run goes
    /// from the transition's start to its target.
    pub fn start(&self, options: Option<RepeatOptions>) -> &Self {
        if !self.status().is_free() {
            self.stop();
        }

        let current = self.inner.transition.options(None);
        let (start, target) = (current.start_value(), current.target_value());

        let completer = {
            let mut state = self.inner.state.borrow_mut();
            if let Some(options) = options {
                state.options.merge(options);
            }
            state.reset();
            state.sequence += 1;
            state.endpoints = Some((start, target));

            let weak = Rc::downgrade(&self.inner);
            let sequence = state.sequence;
            let completer = Callback::new(move |transition: &Transition| {
                if let Some(inner) = weak.upgrade() {
                    Repeater { inner }.on_run_completed(transition, sequence);
                }
            });
            state.completer = Some(completer.clone());
            completer
        };

        self.inner.transition.start(Some(TransitionOptions {
            start: Some(start),
            target: Some(target),
            on_completed: Some(completer),
            ..Default::default()
        }));

        {
            let mut state = self.inner.state.borrow_mut();
            state.status = WorkStatus::Working;
            tracing::debug!(
                transition = %self.inner.transition.id(),
                count = state.options.count.unwrap_or(DEFAULT_REPEAT_COUNT),
                mode = ?state.options.mode.unwrap_or(DEFAULT_REPEAT_MODE),
                "Repeater started"
            );
        }

        self.notify(RepeaterEvent::Started, |o| o.on_started.clone());
        self
    }

    /// Pause a working sequence; no-op otherwise
    pub fn pause(&self) -> &Self {
        if !self.status().is_working() {
            return self;
        }

        self.inner.transition.pause();
        self.inner.state.borrow_mut().status = WorkStatus::Paused;
        tracing::debug!(transition = %self.inner.transition.id(), "Repeater paused");

        self.notify(RepeaterEvent::Paused, |o| o.on_paused.clone());
        self
    }

    /// Resume a paused sequence; no-op otherwise
    pub fn resume(&self) -> &Self {
        if !self.status().is_paused() {
            return self;
        }

        self.inner.transition.resume();
        self.inner.state.borrow_mut().status = WorkStatus::Working;
        tracing::debug!(transition = %self.inner.transition.id(), "Repeater resumed");

        self.notify(RepeaterEvent::Resumed, |o| o.on_resumed.clone());
        self
    }

    /// Stop the wrapped transition and reset the repeat counter.
    ///
    /// The transition gets its original start and target back. The stopped
    /// notification fires on every call, including on a free repeater.
    pub fn stop(&self) -> &Self {
        self.inner.transition.stop();

        {
            let mut state = self.inner.state.borrow_mut();
            state.reset();
            state.sequence += 1;
        }
        self.restore_endpoints();
        tracing::debug!(transition = %self.inner.transition.id(), "Repeater stopped");

        self.notify(RepeaterEvent::Stopped, |o| o.on_stopped.clone());
        self
    }

    /// Stop if running, drop every subscription and destroy the transition.
    ///
    /// The repeater must not be started again afterwards.
    pub fn destroy(&self) {
        if !self.status().is_free() {
            self.stop();
        }
        self.clear_events();
        self.inner.state.borrow_mut().completer = None;
        self.inner.transition.destroy();
        tracing::debug!(transition = %self.inner.transition.id(), "Repeater destroyed");
    }

    /// Subscribe to a lifecycle event
    pub fn on(&self, event: RepeaterEvent, f: impl Fn(&RepeatContext) + 'static) -> Subscription {
        self.inner.emitter.on(event, f)
    }

    /// Subscribe to the next occurrence of a lifecycle event
    pub fn once(&self, event: RepeaterEvent, f: impl Fn(&RepeatContext) + 'static) -> Subscription {
        self.inner.emitter.once(event, f)
    }

    /// Deliver `event` to its subscribers
    pub fn emit(&self, event: RepeaterEvent) {
        self.inner.emitter.emit(event, &self.context());
    }

    /// Drop every event subscription
    pub fn clear_events(&self) {
        self.inner.emitter.clear_events();
    }

    /// Number of subscribers of `event`
    pub fn listener_count(&self, event: RepeaterEvent) -> usize {
        self.inner.emitter.listener_count(event)
    }

    fn on_run_completed(&self, transition: &Transition, sequence: u64) {
        let (counts, count, mode) = {
            let mut state = self.inner.state.borrow_mut();
            // Runs of an earlier sequence, or finishing after a stop, are not ours
            if state.sequence != sequence || state.status.is_free() {
                return;
            }
            state.counts += 1;
            (
                state.counts,
                state.options.count.unwrap_or(DEFAULT_REPEAT_COUNT),
                state.options.mode.unwrap_or(DEFAULT_REPEAT_MODE),
            )
        };
        tracing::debug!(transition = %transition.id(), counts, "Repeater run completed");
        self.notify(RepeaterEvent::Repeated, |o| o.on_repeated.clone());

        // A repeated listener may have stopped or restarted the sequence
        if self.inner.state.borrow().sequence != sequence {
            return;
        }

        if count > 0 && i64::from(counts) >= count {
            self.inner.state.borrow_mut().status = WorkStatus::Free;
            self.restore_endpoints();
            tracing::debug!(transition = %transition.id(), counts, "Repeater completed");
            self.notify(RepeaterEvent::Completed, |o| o.on_completed.clone());
            return;
        }

        let (endpoints, completer) = {
            let mut state = self.inner.state.borrow_mut();
            state.direction = match mode {
                RepeatMode::Normal => RepeatDirection::Forward,
                RepeatMode::Alternate => state.direction.flipped(),
            };
            let endpoints = state.endpoints.map(|(start, target)| match state.direction {
                RepeatDirection::Forward => (start, target),
                RepeatDirection::Backward => (target, start),
            });
            (endpoints, state.completer.clone())
        };

        transition.start(Some(TransitionOptions {
            start: endpoints.map(|(start, _)| start),
            target: endpoints.map(|(_, target)| target),
            on_completed: completer,
            ..Default::default()
        }));
    }

    /// Put the first-run endpoints back into the transition's options
    fn restore_endpoints(&self) {
        let endpoints = self.inner.state.borrow_mut().endpoints.take();
        if let Some((start, target)) = endpoints {
            self.inner.transition.options(Some(TransitionOptions {
                start: Some(start),
                target: Some(target),
                ..Default::default()
            }));
        }
    }

    fn context(&self) -> RepeatContext {
        RepeatContext {
            repeater: self.clone(),
            transition: self.inner.transition.clone(),
            count: self.counts(),
        }
    }

    fn notify(
        &self,
        event: RepeaterEvent,
        pick: impl FnOnce(&RepeatOptions) -> Option<Callback<RepeatContext>>,
    ) {
        let callback = pick(&self.inner.state.borrow().options);
        let context = self.context();
        if let Some(callback) = callback {
            callback.call(&context);
        }
        self.inner.emitter.emit(event, &context);
    }
}

impl fmt::Debug for Repeater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Repeater")
            .field("transition", &self.inner.transition.id())
            .field("status", &state.status)
            .field("counts", &state.counts)
            .field("direction", &state.direction)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{Clock, EventLoop, EventLoopConfig, ManualClock, Scheduler};
    use crate::transition::TransitionEvent;
    use std::cell::Cell;

    fn manual_loop() -> (Rc<EventLoop<ManualClock>>, Rc<dyn Scheduler>) {
        let event_loop = Rc::new(EventLoop::manual(EventLoopConfig::default()));
        let scheduler: Rc<dyn Scheduler> = event_loop.clone();
        (event_loop, scheduler)
    }

    /// Transition 0 → 100 over 100 ms, one tick per 100 ms
    fn short_transition(scheduler: Rc<dyn Scheduler>) -> (Transition, Rc<RefCell<Vec<(f64, f64)>>>) {
        let options = TransitionOptions::new(0.0, 100.0)
            .with_duration(100.0)
            .with_fps(10.0);
        let transition = Transition::new(scheduler, options, |_, _| {});
        let runs = Rc::new(RefCell::new(Vec::new()));
        let runs_in = Rc::clone(&runs);
        transition.on(TransitionEvent::Started, move |t| {
            let options = t.options(None);
            runs_in
                .borrow_mut()
                .push((options.start_value(), options.target_value()));
        });
        (transition, runs)
    }

    fn counter() -> (Rc<Cell<u32>>, impl Fn(&RepeatContext) + 'static) {
        let count = Rc::new(Cell::new(0));
        let count_in = Rc::clone(&count);
        (count, move |_: &RepeatContext| count_in.set(count_in.get() + 1))
    }

    #[test]
    fn test_normal_mode_runs_budget() {
        let (event_loop, scheduler) = manual_loop();
        let (transition, runs) = short_transition(scheduler);
        let repeater = Repeater::new(transition, RepeatOptions::new(3, RepeatMode::Normal));
        let (repeated, on_repeated) = counter();
        let (completed, on_completed) = counter();
        repeater.on(RepeaterEvent::Repeated, on_repeated);
        repeater.on(RepeaterEvent::Completed, on_completed);

        repeater.start(None);
        assert_eq!(repeater.status(), WorkStatus::Working);
        event_loop.run_until_idle();

        assert_eq!(repeated.get(), 3);
        assert_eq!(completed.get(), 1);
        assert_eq!(repeater.counts(), 3);
        assert_eq!(repeater.status(), WorkStatus::Free);
        assert_eq!(repeater.direction(), RepeatDirection::Forward);
        assert_eq!(*runs.borrow(), vec![(0.0, 100.0); 3]);
        assert_eq!(event_loop.clock().now(), 300.0);
        assert!(event_loop.is_idle());
    }

    #[test]
    fn test_alternate_mode_swaps_each_run() {
        let (event_loop, scheduler) = manual_loop();
        let (transition, runs) = short_transition(scheduler);
        let directions = Rc::new(RefCell::new(Vec::new()));
        let directions_in = Rc::clone(&directions);
        let options = RepeatOptions::new(4, RepeatMode::Alternate).with_repeated(move |ctx| {
            directions_in.borrow_mut().push(ctx.repeater.direction());
        });
        let repeater = Repeater::new(transition, options);

        repeater.start(None);
        event_loop.run_until_idle();

        assert_eq!(
            *runs.borrow(),
            vec![(0.0, 100.0), (100.0, 0.0), (0.0, 100.0), (100.0, 0.0)]
        );
        // Direction reported for the run that just completed
        assert_eq!(
            *directions.borrow(),
            vec![
                RepeatDirection::Forward,
                RepeatDirection::Backward,
                RepeatDirection::Forward,
                RepeatDirection::Backward
            ]
        );
    }

    #[test]
    fn test_repeated_payload() {
        let (event_loop, scheduler) = manual_loop();
        let (transition, _) = short_transition(scheduler);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = Rc::clone(&seen);
        let repeater = Repeater::new(transition.clone(), RepeatOptions::new(3, RepeatMode::Normal));
        repeater.on(RepeaterEvent::Repeated, move |ctx| {
            assert!(ctx.transition.ptr_eq(&transition));
            seen_in.borrow_mut().push(ctx.count);
        });

        repeater.start(None);
        event_loop.run_until_idle();

        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_infinite_until_stopped() {
        let (event_loop, scheduler) = manual_loop();
        let (transition, _) = short_transition(scheduler);
        let repeater = Repeater::new(transition, RepeatOptions::default());
        let (completed, on_completed) = counter();
        repeater.on(RepeaterEvent::Completed, on_completed);

        repeater.start(None);
        event_loop.run_for(1050.0);
        assert_eq!(repeater.counts(), 10);
        assert_eq!(repeater.status(), WorkStatus::Working);

        repeater.stop();
        assert_eq!(repeater.counts(), 0);
        assert_eq!(repeater.status(), WorkStatus::Free);
        assert_eq!(repeater.transition().status(), WorkStatus::Free);
        assert!(event_loop.is_idle());

        event_loop.run_for(1000.0);
        assert_eq!(repeater.counts(), 0);
        assert_eq!(completed.get(), 0);
    }

    #[test]
    fn test_stop_mid_run_does_not_count() {
        let (event_loop, scheduler) = manual_loop();
        let options = TransitionOptions::new(0.0, 1.0)
            .with_duration(1000.0)
            .with_fps(100.0);
        let transition = Transition::new(scheduler, options, |_, _| {});
        let repeater = Repeater::new(transition, RepeatOptions::new(2, RepeatMode::Normal));
        let (repeated, on_repeated) = counter();
        repeater.on(RepeaterEvent::Repeated, on_repeated);

        repeater.start(None);
        event_loop.run_for(500.0);
        repeater.stop();
        event_loop.run_for(5000.0);

        assert_eq!(repeated.get(), 0);
        assert!(event_loop.is_idle());
    }

    #[test]
    fn test_pause_and_resume_delegate() {
        let (event_loop, scheduler) = manual_loop();
        let (transition, _) = short_transition(scheduler);
        let repeater = Repeater::new(transition, RepeatOptions::new(2, RepeatMode::Normal));
        let events = Rc::new(RefCell::new(Vec::new()));
        for event in [RepeaterEvent::Paused, RepeaterEvent::Resumed] {
            let events = Rc::clone(&events);
            repeater.on(event, move |_| events.borrow_mut().push(event));
        }

        repeater.resume();
        repeater.start(None);
        event_loop.run_for(50.0);
        repeater.pause();
        repeater.pause();
        assert_eq!(repeater.status(), WorkStatus::Paused);
        assert_eq!(repeater.transition().status(), WorkStatus::Paused);

        event_loop.run_for(1000.0);
        assert_eq!(repeater.counts(), 0);

        repeater.resume();
        assert_eq!(repeater.transition().status(), WorkStatus::Working);
        event_loop.run_until_idle();

        assert_eq!(repeater.counts(), 2);
        assert_eq!(
            *events.borrow(),
            vec![RepeaterEvent::Paused, RepeaterEvent::Resumed]
        );
    }

    #[test]
    fn test_restart_resets_counts() {
        let (event_loop, scheduler) = manual_loop();
        let (transition, _) = short_transition(scheduler);
        let repeater = Repeater::new(transition, RepeatOptions::new(5, RepeatMode::Alternate));
        let (stopped, on_stopped) = counter();
        repeater.on(RepeaterEvent::Stopped, on_stopped);

        repeater.start(None);
        event_loop.run_for(250.0);
        assert_eq!(repeater.counts(), 2);

        repeater.start(Some(RepeatOptions {
            count: Some(1),
            ..Default::default()
        }));
        assert_eq!(stopped.get(), 1);
        assert_eq!(repeater.counts(), 0);
        assert!(repeater.is_forward());

        event_loop.run_until_idle();
        assert_eq!(repeater.counts(), 1);
        assert_eq!(repeater.options(None).mode, Some(RepeatMode::Alternate));
    }

    #[test]
    fn test_stop_from_repeated_listener_ends_chain() {
        let (event_loop, scheduler) = manual_loop();
        let (transition, runs) = short_transition(scheduler);
        let repeater = Repeater::new(transition, RepeatOptions::default());
        repeater.on(RepeaterEvent::Repeated, |ctx| {
            if ctx.count == 2 {
                ctx.repeater.stop();
            }
        });

        repeater.start(None);
        event_loop.run_until_idle();

        assert_eq!(runs.borrow().len(), 2);
        assert_eq!(repeater.status(), WorkStatus::Free);
    }

    #[test]
    fn test_transition_started_directly_after_stop_is_ignored() {
        let (event_loop, scheduler) = manual_loop();
        let (transition, _) = short_transition(scheduler);
        let repeater = Repeater::new(transition.clone(), RepeatOptions::new(3, RepeatMode::Normal));
        let (repeated, on_repeated) = counter();
        repeater.on(RepeaterEvent::Repeated, on_repeated);

        repeater.start(None);
        repeater.stop();
        transition.start(None);
        event_loop.run_until_idle();

        assert_eq!(repeated.get(), 0);
        assert_eq!(transition.status(), WorkStatus::Free);
    }

    #[test]
    fn test_option_callbacks() {
        let (event_loop, scheduler) = manual_loop();
        let (transition, _) = short_transition(scheduler);
        let (started, on_started) = counter();
        let (completed, on_completed) = counter();
        let options = RepeatOptions::new(2, RepeatMode::Normal)
            .with_started(on_started)
            .with_completed(on_completed);
        let repeater = Repeater::new(transition, options);

        repeater.start(None);
        event_loop.run_until_idle();

        assert_eq!(started.get(), 1);
        assert_eq!(completed.get(), 1);
    }

    #[test]
    fn test_destroy() {
        let (event_loop, scheduler) = manual_loop();
        let (transition, _) = short_transition(scheduler);
        let repeater = Repeater::new(transition, RepeatOptions::default());
        let (stopped, on_stopped) = counter();
        repeater.on(RepeaterEvent::Stopped, on_stopped);

        repeater.start(None);
        repeater.destroy();
        event_loop.run_for(1000.0);

        assert_eq!(stopped.get(), 1);
        assert_eq!(repeater.listener_count(RepeaterEvent::Stopped), 0);
        assert_eq!(repeater.transition().listener_count(TransitionEvent::Started), 0);
        assert!(event_loop.is_idle());
    }

    #[test]
    fn test_restart_after_budget_starts_fresh() {
        let (event_loop, scheduler) = manual_loop();
        let (transition, runs) = short_transition(scheduler);
        let repeater = Repeater::new(transition, RepeatOptions::new(3, RepeatMode::Normal));
        let (repeated, on_repeated) = counter();
        let (completed, on_completed) = counter();
        repeater.on(RepeaterEvent::Repeated, on_repeated);
        repeater.on(RepeaterEvent::Completed, on_completed);

        repeater.start(None);
        event_loop.run_until_idle();
        assert_eq!(repeater.counts(), 3);

        repeater.start(None);
        assert_eq!(repeater.counts(), 0);
        assert_eq!(repeater.status(), WorkStatus::Working);
        event_loop.run_until_idle();

        assert_eq!(repeated.get(), 6);
        assert_eq!(completed.get(), 2);
        assert_eq!(runs.borrow().len(), 6);
        assert_eq!(repeater.counts(), 3);
    }

    #[test]
    fn test_alternate_restart_after_even_budget() {
        let (event_loop, scheduler) = manual_loop();
        let (transition, runs) = short_transition(scheduler);
        let repeater = Repeater::new(transition.clone(), RepeatOptions::new(2, RepeatMode::Alternate));

        repeater.start(None);
        event_loop.run_until_idle();
        let options = transition.options(None);
        assert_eq!((options.start, options.target), (Some(0.0), Some(100.0)));

        repeater.start(None);
        assert_eq!(repeater.direction(), RepeatDirection::Forward);
        event_loop.run_until_idle();

        assert_eq!(
            *runs.borrow(),
            vec![(0.0, 100.0), (100.0, 0.0), (0.0, 100.0), (100.0, 0.0)]
        );
    }

    #[test]
    fn test_alternate_restart_after_stop_in_backward_run() {
        let (event_loop, scheduler) = manual_loop();
        let (transition, runs) = short_transition(scheduler);
        let repeater = Repeater::new(transition.clone(), RepeatOptions::new(-1, RepeatMode::Alternate));

        repeater.start(None);
        event_loop.run_for(150.0);
        assert_eq!(repeater.direction(), RepeatDirection::Backward);
        assert_eq!(runs.borrow().last(), Some(&(100.0, 0.0)));

        repeater.stop();
        let options = transition.options(None);
        assert_eq!((options.start, options.target), (Some(0.0), Some(100.0)));

        repeater.start(None);
        assert!(repeater.is_forward());
        assert_eq!(runs.borrow().last(), Some(&(0.0, 100.0)));

        event_loop.run_for(100.0);
        assert_eq!(repeater.direction(), RepeatDirection::Backward);
        assert_eq!(runs.borrow().last(), Some(&(100.0, 0.0)));
    }

    #[test]
    fn test_restart_from_repeated_listener() {
        let (event_loop, scheduler) = manual_loop();
        let (transition, runs) = short_transition(scheduler);
        let repeater = Repeater::new(transition, RepeatOptions::new(2, RepeatMode::Normal));
        let (repeated, on_repeated) = counter();
        let (completed, on_completed) = counter();
        repeater.on(RepeaterEvent::Repeated, on_repeated);
        repeater.on(RepeaterEvent::Completed, on_completed);
        let restarted = Rc::new(Cell::new(false));
        let restarted_in = Rc::clone(&restarted);
        repeater.on(RepeaterEvent::Repeated, move |ctx| {
            if ctx.count == 2 && !restarted_in.replace(true) {
                ctx.repeater.start(None);
            }
        });

        repeater.start(None);
        event_loop.run_until_idle();

        assert!(restarted.get());
        assert_eq!(runs.borrow().len(), 4);
        assert_eq!(repeated.get(), 4);
        assert_eq!(completed.get(), 1);
        assert_eq!(repeater.counts(), 2);
        assert_eq!(repeater.status(), WorkStatus::Free);
    }
}
