// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine defaults and the bezier preset table.

use serde::{Deserialize, Serialize};

/// Default transition duration in milliseconds
pub const DEFAULT_TRANSITION_DURATION: f64 = 300.0;

/// Default preset curve
pub const DEFAULT_TRANSITION_PRESET: PresetCurve = PresetCurve::Linear;

/// Default start delay in milliseconds
pub const DEFAULT_TRANSITION_DELAY: f64 = 0.0;

/// Default frame rate; non-positive means frame-synchronized ticking
pub const DEFAULT_TRANSITION_FPS: f64 = -1.0;

/// Frame rate used when frame-synchronized ticking is requested but the
/// host has no frame source
pub const TRANSITION_FALLBACK_FPS: f64 = 30.0;

/// Default repeat budget; non-positive means repeat forever
pub const DEFAULT_REPEAT_COUNT: i64 = -1;

/// Default repeat mode
pub const DEFAULT_REPEAT_MODE: RepeatMode = RepeatMode::Normal;

/// Control points of a cubic bezier easing curve running from (0,0) to (1,1).
///
/// No range checks are made; an out-of-range curve simply produces odd easing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierCurve {
    /// First control point x
    pub x1: f64,
    /// First control point y
    pub y1: f64,
    /// Second control point x
    pub x2: f64,
    /// Second control point y
    pub y2: f64,
}

impl BezierCurve {
    /// Create a curve from its two control points
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Control points as `[x1, y1, x2, y2]`
    pub fn as_array(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl From<[f64; 4]> for BezierCurve {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

/// Named easing curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PresetCurve {
    /// `linear`
    #[default]
    Linear,
    /// `ease`
    Ease,
    /// `ease-in`
    EaseIn,
    /// `ease-out`
    EaseOut,
    /// `ease-in-out`
    EaseInOut,
}

/// Preset lookup table
pub const BEZIER_CURVE_PRESETS: [(PresetCurve, BezierCurve); 5] = [
    (PresetCurve::Linear, BezierCurve::new(0.0, 0.0, 1.0, 1.0)),
    (PresetCurve::Ease, BezierCurve::new(0.25, 0.1, 0.25, 1.0)),
    (PresetCurve::EaseIn, BezierCurve::new(0.42, 0.0, 1.0, 1.0)),
    (PresetCurve::EaseOut, BezierCurve::new(0.0, 0.0, 0.58, 1.0)),
    (PresetCurve::EaseInOut, BezierCurve::new(0.42, 0.0, 0.58, 1.0)),
];

impl PresetCurve {
    /// The curve this preset stands for
    pub fn curve(&self) -> BezierCurve {
        BEZIER_CURVE_PRESETS
            .iter()
            .find(|(preset, _)| preset == self)
            .map(|(_, curve)| *curve)
            .unwrap_or(BEZIER_CURVE_PRESETS[0].1)
    }

    /// CSS-style name of the preset
    pub fn name(&self) -> &'static str {
        match self {
            PresetCurve::Linear => "linear",
            PresetCurve::Ease => "ease",
            PresetCurve::EaseIn => "ease-in",
            PresetCurve::EaseOut => "ease-out",
            PresetCurve::EaseInOut => "ease-in-out",
        }
    }

    /// All presets
    pub fn all() -> &'static [PresetCurve] {
        &[
            PresetCurve::Linear,
            PresetCurve::Ease,
            PresetCurve::EaseIn,
            PresetCurve::EaseOut,
            PresetCurve::EaseInOut,
        ]
    }
}

/// How consecutive repeater runs relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Every run goes from start to target
    #[default]
    Normal,
    /// Runs alternate between start → target and target → start
    Alternate,
}

/// Convert a frame rate into a tick period in milliseconds.
///
/// A zero rate yields a zero period.
pub fn fps_to_ms(fps: f64) -> f64 {
    if fps == 0.0 {
        return 0.0;
    }

    1000.0 / fps
}
