// SPDX-License-Identifier: MIT OR Apache-2.0
//! Periodic tick timer over a [`Scheduler`].
//!
//! The backend is picked once, at construction:
//! - `fps > 0`: fixed interval of `1000 / fps` ms
//! - `fps <= 0` with frames available: one tick per frame
//! - `fps <= 0` without frames: fixed interval at [`TRANSITION_FALLBACK_FPS`]

use crate::config::{fps_to_ms, TRANSITION_FALLBACK_FPS};
use crate::scheduler::{HandleId, Scheduler};
use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

/// How a timer gets its ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickBackend {
    /// Frame-synchronized; the tick re-registers itself every frame
    Frame,
    /// Fixed interval in milliseconds
    Interval {
        /// Tick period in milliseconds
        period_ms: f64,
    },
}

impl TickBackend {
    /// Resolve the backend for a requested frame rate
    pub fn resolve(fps: f64, supports_frames: bool) -> (TickBackend, f64) {
        if fps > 0.0 {
            (TickBackend::Interval { period_ms: fps_to_ms(fps) }, fps)
        } else if supports_frames {
            (TickBackend::Frame, -1.0)
        } else {
            (
                TickBackend::Interval {
                    period_ms: fps_to_ms(TRANSITION_FALLBACK_FPS),
                },
                TRANSITION_FALLBACK_FPS,
            )
        }
    }

    fn arm(&self, shared: &Rc<TimerShared>) -> HandleId {
        match self {
            TickBackend::Frame => request_next_frame(shared, shared.generation.get()),
            TickBackend::Interval { period_ms } => shared
                .scheduler
                .set_interval(Rc::clone(&shared.callback), *period_ms),
        }
    }

    fn disarm(&self, scheduler: &dyn Scheduler, id: HandleId) {
        match self {
            TickBackend::Frame => scheduler.cancel_frame(id),
            TickBackend::Interval { .. } => scheduler.clear_interval(id),
        }
    }
}

struct TimerShared {
    scheduler: Rc<dyn Scheduler>,
    fps: f64,
    backend: TickBackend,
    callback: Rc<dyn Fn()>,
    handle: Cell<Option<HandleId>>,
    running: Cell<bool>,
    // Bumped on every start so a frame chain from an earlier run dies out
    generation: Cell<u64>,
}

fn request_next_frame(shared: &Rc<TimerShared>, generation: u64) -> HandleId {
    let weak = Rc::downgrade(shared);
    shared
        .scheduler
        .request_frame(Box::new(move || animate(&weak, generation)))
}

fn animate(weak: &Weak<TimerShared>, generation: u64) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    if !shared.running.get() || shared.generation.get() != generation {
        return;
    }

    (shared.callback)();

    if !shared.running.get() || shared.generation.get() != generation {
        return;
    }
    let id = request_next_frame(&shared, generation);
    shared.handle.set(Some(id));
}

/// Calls a callback repeatedly until stopped
pub struct Timer {
    shared: Rc<TimerShared>,
}

impl Timer {
    /// Create a stopped timer ticking at `fps`
    pub fn new(scheduler: Rc<dyn Scheduler>, fps: f64, callback: impl Fn() + 'static) -> Self {
        let (backend, fps) = TickBackend::resolve(fps, scheduler.supports_frames());
        Self {
            shared: Rc::new(TimerShared {
                scheduler,
                fps,
                backend,
                callback: Rc::new(callback),
                handle: Cell::new(None),
                running: Cell::new(false),
                generation: Cell::new(0),
            }),
        }
    }

    /// Current scheduler handle, if running
    pub fn id(&self) -> Option<HandleId> {
        self.shared.handle.get()
    }

    /// Resolved frame rate; `-1` for frame-synchronized ticking
    pub fn fps(&self) -> f64 {
        self.shared.fps
    }

    /// Resolved backend
    pub fn backend(&self) -> TickBackend {
        self.shared.backend
    }

    /// Whether the timer is ticking
    pub fn is_running(&self) -> bool {
        self.shared.running.get()
    }

    /// Start ticking; a running timer is stopped and started afresh
    pub fn start(&self) -> &Self {
        self.stop();

        let shared = &self.shared;
        shared.generation.set(shared.generation.get() + 1);
        shared.running.set(true);
        let id = shared.backend.arm(shared);
        shared.handle.set(Some(id));

        tracing::trace!(handle = %id, backend = ?shared.backend, "Timer started");
        self
    }

    /// Stop ticking; no-op when stopped
    pub fn stop(&self) -> &Self {
        let shared = &self.shared;
        if let Some(id) = shared.handle.take() {
            shared.backend.disarm(shared.scheduler.as_ref(), id);
            tracing::trace!(handle = %id, "Timer stopped");
        }
        shared.running.set(false);
        self
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.id())
            .field("fps", &self.fps())
            .field("backend", &self.backend())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{EventLoop, EventLoopConfig, ManualClock};
    use std::cell::RefCell;

    fn manual_loop(config: EventLoopConfig) -> (Rc<EventLoop<ManualClock>>, Rc<dyn Scheduler>) {
        let event_loop = Rc::new(EventLoop::manual(config));
        let scheduler: Rc<dyn Scheduler> = event_loop.clone();
        (event_loop, scheduler)
    }

    fn tick_counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
        let ticks = Rc::new(Cell::new(0));
        let ticks_in = Rc::clone(&ticks);
        (ticks, move || ticks_in.set(ticks_in.get() + 1))
    }

    #[test]
    fn test_backend_resolution() {
        assert_eq!(
            TickBackend::resolve(10.0, true),
            (TickBackend::Interval { period_ms: 100.0 }, 10.0)
        );
        assert_eq!(TickBackend::resolve(-1.0, true), (TickBackend::Frame, -1.0));
        assert_eq!(TickBackend::resolve(0.0, true), (TickBackend::Frame, -1.0));
        let (backend, fps) = TickBackend::resolve(-1.0, false);
        assert_eq!(fps, TRANSITION_FALLBACK_FPS);
        assert_eq!(backend, TickBackend::Interval { period_ms: 1000.0 / 30.0 });
    }

    #[test]
    fn test_interval_ticks() {
        let (event_loop, scheduler) = manual_loop(EventLoopConfig::default());
        let (ticks, callback) = tick_counter();
        let timer = Timer::new(scheduler, 10.0, callback);

        assert!(!timer.is_running());
        assert_eq!(timer.id(), None);
        timer.start();
        assert!(timer.is_running());
        assert!(timer.id().is_some());

        event_loop.run_for(1000.0);
        assert_eq!(ticks.get(), 10);

        timer.stop();
        assert!(!timer.is_running());
        assert_eq!(timer.id(), None);
        assert!(event_loop.is_idle());
    }

    #[test]
    fn test_frame_ticks() {
        let (event_loop, scheduler) = manual_loop(EventLoopConfig { frame_rate: Some(50.0) });
        let (ticks, callback) = tick_counter();
        let timer = Timer::new(scheduler, -1.0, callback);
        assert_eq!(timer.backend(), TickBackend::Frame);

        timer.start();
        event_loop.run_for(200.0);
        assert_eq!(ticks.get(), 10);

        timer.stop();
        event_loop.run_for(200.0);
        assert_eq!(ticks.get(), 10);
        assert!(event_loop.is_idle());
    }

    #[test]
    fn test_fallback_without_frames() {
        let (event_loop, scheduler) = manual_loop(EventLoopConfig::without_frames());
        let (ticks, callback) = tick_counter();
        let timer = Timer::new(scheduler, -1.0, callback);
        assert_eq!(timer.fps(), TRANSITION_FALLBACK_FPS);

        timer.start();
        event_loop.run_for(1010.0);
        assert_eq!(ticks.get(), 30);
    }

    #[test]
    fn test_restart_keeps_single_registration() {
        let (event_loop, scheduler) = manual_loop(EventLoopConfig::default());
        let (ticks, callback) = tick_counter();
        let timer = Timer::new(scheduler, 10.0, callback);

        timer.start();
        timer.start();
        timer.start();
        assert_eq!(event_loop.pending(), 1);

        event_loop.run_for(500.0);
        assert_eq!(ticks.get(), 5);
    }

    #[test]
    fn test_stop_from_inside_frame_callback() {
        let (event_loop, scheduler) = manual_loop(EventLoopConfig::default());
        let slot: Rc<RefCell<Option<Timer>>> = Rc::new(RefCell::new(None));
        let ticks = Rc::new(Cell::new(0));

        let slot_in = Rc::clone(&slot);
        let ticks_in = Rc::clone(&ticks);
        let timer = Timer::new(scheduler, -1.0, move || {
            ticks_in.set(ticks_in.get() + 1);
            if ticks_in.get() == 3 {
                if let Some(timer) = slot_in.borrow().as_ref() {
                    timer.stop();
                }
            }
        });
        timer.start();
        *slot.borrow_mut() = Some(timer);

        event_loop.run_for(1000.0);
        assert_eq!(ticks.get(), 3);
        assert!(event_loop.is_idle());
    }

    #[test]
    fn test_restart_from_inside_frame_callback_keeps_one_chain() {
        let (event_loop, scheduler) = manual_loop(EventLoopConfig { frame_rate: Some(10.0) });
        let slot: Rc<RefCell<Option<Timer>>> = Rc::new(RefCell::new(None));
        let ticks = Rc::new(Cell::new(0));

        let slot_in = Rc::clone(&slot);
        let ticks_in = Rc::clone(&ticks);
        let timer = Timer::new(scheduler, -1.0, move || {
            ticks_in.set(ticks_in.get() + 1);
            if let Some(timer) = slot_in.borrow().as_ref() {
                timer.stop();
                timer.start();
            }
        });
        timer.start();
        *slot.borrow_mut() = Some(timer);

        event_loop.run_for(1000.0);
        assert_eq!(ticks.get(), 10);
        assert_eq!(event_loop.pending(), 1);
    }

    #[test]
    fn test_drop_cancels_registration() {
        let (event_loop, scheduler) = manual_loop(EventLoopConfig::default());
        let (ticks, callback) = tick_counter();
        let timer = Timer::new(scheduler, 20.0, callback);
        timer.start();
        drop(timer);

        event_loop.run_for(500.0);
        assert_eq!(ticks.get(), 0);
        assert!(event_loop.is_idle());
    }
}
