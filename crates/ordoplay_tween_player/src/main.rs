// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` Tween Player - runs animation profile entries in real time
//!
//! Loads a profile, starts one named transition (optionally wrapped in a
//! named repeater) on an event loop over the system clock, and logs every
//! value until the loop goes idle.
//!
//! ```text
//! ordoplay_tween_player <profile> <transition> [--repeat <name>] [--max-ms <ms>]
//! ```

use clap::Parser;
use ordoplay_tween::config::DEFAULT_REPEAT_COUNT;
use ordoplay_tween::profile::Result;
use ordoplay_tween::{
    AnimationProfile, EventLoop, RepeatOptions, Repeater, RepeaterEvent, Scheduler, Transition,
    TransitionEvent,
};
use std::path::PathBuf;
use std::rc::Rc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Run limit applied to endless repeats when `--max-ms` is absent
const ENDLESS_RUN_LIMIT_MS: f64 = 10_000.0;

/// Play one transition of an animation profile in real time
#[derive(Debug, Parser)]
#[command(name = "ordoplay_tween_player", version, about)]
struct PlayerArgs {
    /// Profile file (`.ron` or `.json`)
    profile: PathBuf,
    /// Name of the transition entry to play
    transition: String,
    /// Name of a repeat entry to wrap the transition in
    #[arg(long)]
    repeat: Option<String>,
    /// Stop after this many milliseconds
    #[arg(long, value_parser = parse_limit)]
    max_ms: Option<f64>,
}

fn parse_limit(value: &str) -> std::result::Result<f64, String> {
    let ms: f64 = value.parse().map_err(|_| format!("not a number: {value}"))?;
    if !ms.is_finite() || ms < 0.0 {
        return Err(format!("must be a non-negative number of milliseconds: {value}"));
    }
    Ok(ms)
}

fn run(args: PlayerArgs) -> Result<()> {
    let profile = AnimationProfile::load(&args.profile)?;
    let options = profile.transition(&args.transition)?;
    let repeat: Option<RepeatOptions> = args
        .repeat
        .as_deref()
        .map(|name| profile.repeat(name))
        .transpose()?;

    let event_loop = Rc::new(EventLoop::system(profile.event_loop));
    let scheduler: Rc<dyn Scheduler> = event_loop.clone();

    let entry = args.transition.clone();
    let transition = Transition::new(scheduler, options, move |value, transition| {
        tracing::info!(
            entry = %entry,
            progress = transition.progress(),
            value,
            "Tick"
        );
    });
    transition.on(TransitionEvent::Completed, |transition| {
        tracing::info!(id = %transition.id(), "Transition completed");
    });

    let endless = repeat.as_ref().is_some_and(|o| o.count.unwrap_or(DEFAULT_REPEAT_COUNT) <= 0);
    let max_ms = match args.max_ms {
        Some(ms) => Some(ms),
        None if endless => {
            tracing::warn!(
                limit_ms = ENDLESS_RUN_LIMIT_MS,
                "Endless repeat without --max-ms; stopping after the default limit"
            );
            Some(ENDLESS_RUN_LIMIT_MS)
        }
        None => None,
    };

    let repeater = repeat.map(|options| Repeater::new(transition.clone(), options));
    match &repeater {
        Some(repeater) => {
            repeater.on(RepeaterEvent::Repeated, |ctx| {
                tracing::info!(count = ctx.count, forward = ctx.repeater.is_forward(), "Repeated");
            });
            repeater.on(RepeaterEvent::Completed, |ctx| {
                tracing::info!(count = ctx.count, "Repeat completed");
            });
            repeater.start(None);
        }
        None => {
            transition.start(None);
        }
    }

    match max_ms {
        Some(ms) => event_loop.run_for(ms),
        None => event_loop.run_until_idle(),
    }

    match repeater {
        Some(repeater) => repeater.destroy(),
        None => transition.destroy(),
    }
    Ok(())
}

fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ordoplay_tween=debug,ordoplay_tween_player=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OrdoPlay Tween Player v{}", env!("CARGO_PKG_VERSION"));

    let args = PlayerArgs::parse();
    if let Err(e) = run(args) {
        tracing::error!("Player failed: {e}");
        std::process::exit(1);
    }
}
