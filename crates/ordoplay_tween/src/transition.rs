// SPDX-License-Identifier: MIT OR Apache-2.0
//! Eased value transitions.
//!
//! A [`Transition`] turns clock time into eased progress and an interpolated
//! value, calling a per-tick callback until the target is reached. It can be
//! paused, resumed, stopped and restarted any number of times.
//!
//! ## State machine
//!
//! ```text
//! Free ──start──▶ Working ──pause──▶ Paused
//!  ▲                 │  ◀──resume──    │
//!  └──stop/complete──┴────stop─────────┘
//! ```
//!
//! Time spent paused never advances progress.

use crate::config::{
    BezierCurve, PresetCurve, DEFAULT_TRANSITION_DELAY, DEFAULT_TRANSITION_DURATION,
    DEFAULT_TRANSITION_FPS, DEFAULT_TRANSITION_PRESET,
};
use crate::easing::{lerp, CubicBezier};
use crate::emitter::{Callback, Emitter, Subscription};
use crate::scheduler::Scheduler;
use crate::timer::Timer;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use uuid::Uuid;

/// Transition errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// `value()` called before `start()` built an easing curve
    #[error("Transition has no easing curve yet; call start() first")]
    NotStarted,
}

/// Result type for transition operations
pub type Result<T> = std::result::Result<T, TransitionError>;

/// Unique identifier for a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionId(pub Uuid);

impl TransitionId {
    /// Create a new random transition ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransitionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Run state shared by transitions and repeaters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WorkStatus {
    /// Idle; before the first start and after stop or completion
    #[default]
    Free,
    /// Ticking
    Working,
    /// Paused mid-run
    Paused,
}

impl WorkStatus {
    /// Idle
    pub fn is_free(&self) -> bool {
        matches!(self, WorkStatus::Free)
    }

    /// Ticking
    pub fn is_working(&self) -> bool {
        matches!(self, WorkStatus::Working)
    }

    /// Paused mid-run
    pub fn is_paused(&self) -> bool {
        matches!(self, WorkStatus::Paused)
    }
}

/// Lifecycle events of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionEvent {
    /// A run began
    Started,
    /// The run was paused
    Paused,
    /// The run was resumed
    Resumed,
    /// The run was stopped, explicitly or by completing
    Stopped,
    /// Progress reached 1
    Completed,
}

/// Options of a transition.
///
/// Every field is optional so a partial set can be merged onto the stored
/// options; fields left as `None` keep their previous value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionOptions {
    /// Value at progress 0 (default 0)
    pub start: Option<f64>,
    /// Value at progress 1 (default 0)
    pub target: Option<f64>,
    /// Run length in milliseconds
    pub duration: Option<f64>,
    /// Named easing curve
    pub preset: Option<PresetCurve>,
    /// Explicit easing curve; wins over `preset`
    pub bezier: Option<BezierCurve>,
    /// Milliseconds between `start()` and progress leaving 0
    pub delay: Option<f64>,
    /// Tick rate; non-positive means one tick per frame
    pub fps: Option<f64>,
    /// Called when a run starts
    #[serde(skip)]
    pub on_started: Option<Callback<Transition>>,
    /// Called on pause
    #[serde(skip)]
    pub on_paused: Option<Callback<Transition>>,
    /// Called on resume
    #[serde(skip)]
    pub on_resumed: Option<Callback<Transition>>,
    /// Called on stop
    #[serde(skip)]
    pub on_stopped: Option<Callback<Transition>>,
    /// Called when progress reaches 1
    #[serde(skip)]
    pub on_completed: Option<Callback<Transition>>,
}

impl TransitionOptions {
    /// Options running from `start` to `target`
    pub fn new(start: f64, target: f64) -> Self {
        Self {
            start: Some(start),
            target: Some(target),
            ..Default::default()
        }
    }

    /// Set the duration in milliseconds
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the preset curve
    pub fn with_preset(mut self, preset: PresetCurve) -> Self {
        self.preset = Some(preset);
        self
    }

    /// Set an explicit curve
    pub fn with_bezier(mut self, bezier: impl Into<BezierCurve>) -> Self {
        self.bezier = Some(bezier.into());
        self
    }

    /// Set the start delay in milliseconds
    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set the tick rate
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = Some(fps);
        self
    }

    /// Set the started callback
    pub fn with_started(mut self, f: impl Fn(&Transition) + 'static) -> Self {
        self.on_started = Some(Callback::new(f));
        self
    }

    /// Set the paused callback
    pub fn with_paused(mut self, f: impl Fn(&Transition) + 'static) -> Self {
        self.on_paused = Some(Callback::new(f));
        self
    }

    /// Set the resumed callback
    pub fn with_resumed(mut self, f: impl Fn(&Transition) + 'static) -> Self {
        self.on_resumed = Some(Callback::new(f));
        self
    }

    /// Set the stopped callback
    pub fn with_stopped(mut self, f: impl Fn(&Transition) + 'static) -> Self {
        self.on_stopped = Some(Callback::new(f));
        self
    }

    /// Set the completed callback
    pub fn with_completed(mut self, f: impl Fn(&Transition) + 'static) -> Self {
        self.on_completed = Some(Callback::new(f));
        self
    }

    /// Shallow merge: every field set in `other` replaces the stored one
    pub fn merge(&mut self, other: TransitionOptions) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.start, other.start);
        take(&mut self.target, other.target);
        take(&mut self.duration, other.duration);
        take(&mut self.preset, other.preset);
        take(&mut self.bezier, other.bezier);
        take(&mut self.delay, other.delay);
        take(&mut self.fps, other.fps);
        take(&mut self.on_started, other.on_started);
        take(&mut self.on_paused, other.on_paused);
        take(&mut self.on_resumed, other.on_resumed);
        take(&mut self.on_stopped, other.on_stopped);
        take(&mut self.on_completed, other.on_completed);
    }

    /// Start value, defaulting to 0
    pub fn start_value(&self) -> f64 {
        self.start.unwrap_or(0.0)
    }

    /// Target value, defaulting to 0
    pub fn target_value(&self) -> f64 {
        self.target.unwrap_or(0.0)
    }

    /// Easing curve in effect: `bezier`, else `preset`, else the default preset
    pub fn curve(&self) -> BezierCurve {
        self.bezier
            .unwrap_or_else(|| self.preset.unwrap_or(DEFAULT_TRANSITION_PRESET).curve())
    }
}

struct TransitionState {
    options: TransitionOptions,
    status: WorkStatus,
    progress: f64,
    easing: Option<CubicBezier>,
    timer: Option<Timer>,
    start_time: f64,
    duration: f64,
    last_pause_at: Option<f64>,
    paused_ms: f64,
}

impl TransitionState {
    fn value(&self) -> Option<f64> {
        let easing = self.easing.as_ref()?;
        Some(lerp(
            self.options.start_value(),
            self.options.target_value(),
            easing.evaluate(self.progress),
        ))
    }

    fn reset(&mut self) {
        self.status = WorkStatus::Free;
        self.progress = 0.0;
        self.easing = None;
        self.last_pause_at = None;
        self.paused_ms = 0.0;
    }
}

type TickCallback = Box<dyn FnMut(f64, &Transition)>;

struct TransitionInner {
    id: TransitionId,
    scheduler: Rc<dyn Scheduler>,
    emitter: Emitter<TransitionEvent, Transition>,
    callback: RefCell<TickCallback>,
    state: RefCell<TransitionState>,
}

/// Eased interpolation from a start value to a target value.
///
/// Cloning yields another handle to the same transition.
#[derive(Clone)]
pub struct Transition {
    inner: Rc<TransitionInner>,
}

impl Transition {
    /// Create a transition that calls `on_tick` with every new value
    pub fn new(
        scheduler: Rc<dyn Scheduler>,
        options: TransitionOptions,
        on_tick: impl FnMut(f64, &Transition) + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(TransitionInner {
                id: TransitionId::new(),
                scheduler,
                emitter: Emitter::new(),
                callback: RefCell::new(Box::new(on_tick)),
                state: RefCell::new(TransitionState {
                    options,
                    status: WorkStatus::Free,
                    progress: 0.0,
                    easing: None,
                    timer: None,
                    start_time: 0.0,
                    duration: DEFAULT_TRANSITION_DURATION,
                    last_pause_at: None,
                    paused_ms: 0.0,
                }),
            }),
        }
    }

    /// Create a transition with empty options
    pub fn with_callback(
        scheduler: Rc<dyn Scheduler>,
        on_tick: impl FnMut(f64, &Transition) + 'static,
    ) -> Self {
        Self::new(scheduler, TransitionOptions::default(), on_tick)
    }

    /// Unique id of this transition
    pub fn id(&self) -> TransitionId {
        self.inner.id
    }

    /// Whether two handles refer to the same transition
    pub fn ptr_eq(&self, other: &Transition) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Merge `options` (if any) onto the stored options and return the result
    pub fn options(&self, options: Option<TransitionOptions>) -> TransitionOptions {
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

    /// Progress of the current run, clamped to `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.inner.state.borrow().progress
    }

    /// Value at the last computed progress
    pub fn value(&self) -> Result<f64> {
        self.inner
            .state
            .borrow()
            .value()
            .ok_or(TransitionError::NotStarted)
    }

    /// Start a run, merging `options` first.
    ///
    /// A transition that is not free is stopped before the new run begins.
    pub fn start(&self, options: Option<TransitionOptions>) -> &Self {
        if !self.status().is_free() {
            self.stop();
        }

        let now = self.inner.scheduler.now();
        let fps = {
            let mut state = self.inner.state.borrow_mut();
            if let Some(options) = options {
                state.options.merge(options);
            }

            let duration = state.options.duration.unwrap_or(DEFAULT_TRANSITION_DURATION);
            if duration <= 0.0 {
                tracing::warn!(id = %self.inner.id, duration, "Non-positive transition duration");
            }
            let delay = state.options.delay.unwrap_or(DEFAULT_TRANSITION_DELAY);

            state.easing = Some(CubicBezier::new(state.options.curve()));
            state.start_time = now + delay;
            state.duration = duration;
            state.options.fps.unwrap_or(DEFAULT_TRANSITION_FPS)
        };

        let weak = Rc::downgrade(&self.inner);
        let timer = Timer::new(Rc::clone(&self.inner.scheduler), fps, move || {
            if let Some(inner) = weak.upgrade() {
                Transition { inner }.tick();
            }
        });
        timer.start();

        {
            let mut state = self.inner.state.borrow_mut();
            state.timer = Some(timer);
            state.status = WorkStatus::Working;
            tracing::debug!(
                id = %self.inner.id,
                start = state.options.start_value(),
                target = state.options.target_value(),
                duration = state.duration,
                fps,
                "Transition started"
            );
        }

        self.notify(TransitionEvent::Started, |o| o.on_started.clone());
        self
    }

    /// Pause a working run; no-op otherwise
    pub fn pause(&self) -> &Self {
        {
            let mut state = self.inner.state.borrow_mut();
            if !state.status.is_working() {
                return self;
            }
            let Some(timer) = state.timer.as_ref() else {
                return self;
            };
            timer.stop();
            state.last_pause_at = Some(self.inner.scheduler.now());
            state.status = WorkStatus::Paused;
            tracing::debug!(id = %self.inner.id, progress = state.progress, "Transition paused");
        }

        self.notify(TransitionEvent::Paused, |o| o.on_paused.clone());
        self
    }

    /// Resume a paused run; no-op otherwise
    pub fn resume(&self) -> &Self {
        {
            let mut state = self.inner.state.borrow_mut();
            if !state.status.is_paused() || state.timer.is_none() {
                return self;
            }
            if let Some(last) = state.last_pause_at.take() {
                state.paused_ms += self.inner.scheduler.now() - last;
            }
            if let Some(timer) = state.timer.as_ref() {
                timer.start();
            }
            state.status = WorkStatus::Working;
            tracing::debug!(id = %self.inner.id, paused_ms = state.paused_ms, "Transition resumed");
        }

        self.notify(TransitionEvent::Resumed, |o| o.on_resumed.clone());
        self
    }

    /// Stop the run and reset progress.
    ///
    /// The stopped notification fires on every call, including on a free
    /// transition.
    pub fn stop(&self) -> &Self {
        let timer = {
            let mut state = self.inner.state.borrow_mut();
            let timer = state.timer.take();
            state.reset();
            timer
        };
        if let Some(timer) = timer {
            timer.stop();
        }
        tracing::debug!(id = %self.inner.id, "Transition stopped");

        self.notify(TransitionEvent::Stopped, |o| o.on_stopped.clone());
        self
    }

    /// Stop if running, then drop every event subscription.
    ///
    /// The transition must not be started again afterwards.
    pub fn destroy(&self) {
        if !self.status().is_free() {
            self.stop();
        }
        self.clear_events();
        tracing::debug!(id = %self.inner.id, "Transition destroyed");
    }

    /// Subscribe to a lifecycle event
    pub fn on(&self, event: TransitionEvent, f: impl Fn(&Transition) + 'static) -> Subscription {
        self.inner.emitter.on(event, f)
    }

    /// Subscribe to the next occurrence of a lifecycle event
    pub fn once(&self, event: TransitionEvent, f: impl Fn(&Transition) + 'static) -> Subscription {
        self.inner.emitter.once(event, f)
    }

    /// Deliver `event` to its subscribers with this transition as payload
    pub fn emit(&self, event: TransitionEvent) {
        self.inner.emitter.emit(event, self);
    }

    /// Drop every event subscription
    pub fn clear_events(&self) {
        self.inner.emitter.clear_events();
    }

    /// Number of subscribers of `event`
    pub fn listener_count(&self, event: TransitionEvent) -> usize {
        self.inner.emitter.listener_count(event)
    }

    fn tick(&self) {
        let now = self.inner.scheduler.now();
        let value = {
            let mut state = self.inner.state.borrow_mut();
            let raw = (now - state.start_time - state.paused_ms) / state.duration;
            if raw.is_nan() {
                tracing::warn!(id = %self.inner.id, "Transition progress is not a number");
            }
            // f64::max drops NaN, so NaN progress reads as 0
            state.progress = raw.max(0.0).min(1.0);
            tracing::trace!(id = %self.inner.id, progress = state.progress, "Transition tick");
            state.value()
        };
        let Some(value) = value else {
            return;
        };

        {
            let mut callback = self.inner.callback.borrow_mut();
            (*callback)(value, self);
        }

        if self.progress() >= 1.0 {
            self.stop();
            tracing::debug!(id = %self.inner.id, "Transition completed");
            self.notify(TransitionEvent::Completed, |o| o.on_completed.clone());
        }
    }

    fn notify(
        &self,
        event: TransitionEvent,
        pick: impl FnOnce(&TransitionOptions) -> Option<Callback<Transition>>,
    ) {
        let callback = pick(&self.inner.state.borrow().options);
        if let Some(callback) = callback {
            callback.call(self);
        }
        self.inner.emitter.emit(event, self);
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Transition")
            .field("id", &self.inner.id)
            .field("status", &state.status)
            .field("progress", &state.progress)
            .field("options", &state.options)
            .finish()
    }
}
