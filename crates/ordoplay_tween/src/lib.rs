// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tweening engine for OrdoPlay.
//!
//! This crate animates a single numeric value over time:
//! - Cubic-bezier easing with named presets
//! - Periodic timers over frames or fixed intervals
//! - Transitions with delay, pause/resume and restart
//! - Repeaters replaying a transition, optionally alternating direction
//! - Lifecycle events through a small emitter
//! - RON/JSON animation profiles
//!
//! ## Architecture
//!
//! The engine is single-threaded and callback-driven. Everything time-related
//! goes through the [`Scheduler`] capability; [`EventLoop`] hosts it over a
//! [`SystemClock`] for real time or a [`ManualClock`] for deterministic runs.
//! Handles ([`Transition`], [`Repeater`]) are cheap clones of shared state.

pub mod config;
pub mod easing;
pub mod emitter;
pub mod profile;
pub mod repeater;
pub mod scheduler;
pub mod timer;
pub mod transition;

pub use config::{fps_to_ms, BezierCurve, PresetCurve, RepeatMode, BEZIER_CURVE_PRESETS};
pub use easing::{lerp, CubicBezier};
pub use emitter::{Callback, Emitter, Subscription};
pub use profile::{AnimationProfile, ProfileError, ProfileFormat, PROFILE_FORMAT_VERSION};
pub use repeater::{RepeatContext, RepeatDirection, RepeatOptions, Repeater, RepeaterEvent};
pub use scheduler::{
    Clock, EventLoop, EventLoopConfig, HandleId, ManualClock, Scheduler, SystemClock,
};
pub use timer::{TickBackend, Timer};
pub use transition::{
    Transition, TransitionError, TransitionEvent, TransitionId, TransitionOptions, WorkStatus,
};
