// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cubic bezier easing.
//!
//! Maps normalized time to normalized curve progress the way CSS
//! `cubic-bezier()` timing functions do: solve the curve's x polynomial for
//! the parameter matching the input time, then read y at that parameter.

use crate::config::BezierCurve;

const NEWTON_ITERATIONS: usize = 8;
const NEWTON_MIN_SLOPE: f64 = 1e-3;
const SOLVE_EPSILON: f64 = 1e-7;
const BISECTION_ITERATIONS: usize = 32;

/// Evaluator for one cubic bezier curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    curve: BezierCurve,
}

impl CubicBezier {
    /// Build an evaluator for `curve`
    pub fn new(curve: BezierCurve) -> Self {
        Self { curve }
    }

    /// The curve being evaluated
    pub fn curve(&self) -> BezierCurve {
        self.curve
    }

    /// Eased progress at normalized time `t`.
    ///
    /// The end points are exact: `evaluate(0.0) == 0.0` and
    /// `evaluate(1.0) == 1.0` for every curve.
    pub fn evaluate(&self, t: f64) -> f64 {
        let BezierCurve { x1, y1, x2, y2 } = self.curve;

        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        if x1 == y1 && x2 == y2 {
            return t;
        }

        let param = solve_x(x1, x2, t);
        sample(y1, y2, param)
    }
}

/// Linear interpolation between two values
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    t * (to - from) + from
}

/// One coordinate of the curve at parameter `t`.
/// B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn sample(p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t
}

/// dB/dt = 3(1-t)²·p1 + 6(1-t)t·(p2-p1) + 3t²·(1-p2)
#[inline]
fn slope(p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * p1 + 6.0 * mt * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
}

/// Find the parameter whose x coordinate is `x`.
///
/// Newton-Raphson first; falls back to bisection where the curve is too flat
/// for Newton to converge.
fn solve_x(x1: f64, x2: f64, x: f64) -> f64 {
    let mut t = x;
    for _ in 0..NEWTON_ITERATIONS {
        let err = sample(x1, x2, t) - x;
        if err.abs() < SOLVE_EPSILON {
            return t;
        }
        let d = slope(x1, x2, t);
        if d.abs() < NEWTON_MIN_SLOPE {
            break;
        }
        t -= err / d;
    }

    let (mut lo, mut hi) = (0.0, 1.0);
    t = x;
    for _ in 0..BISECTION_ITERATIONS {
        let current = sample(x1, x2, t);
        if (current - x).abs() < SOLVE_EPSILON {
            break;
        }
        if current < x {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) / 2.0;
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PresetCurve;

    const EPSILON: f64 = 0.001;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_endpoints_exact_for_presets() {
        for preset in PresetCurve::all() {
            let ease = CubicBezier::new(preset.curve());
            assert_eq!(ease.evaluate(0.0), 0.0, "{}", preset.name());
            assert_eq!(ease.evaluate(1.0), 1.0, "{}", preset.name());
        }
    }

    #[test]
    fn test_linear() {
        let ease = CubicBezier::new(PresetCurve::Linear.curve());
        assert!(approx_eq(ease.evaluate(0.25), 0.25));
        assert!(approx_eq(ease.evaluate(0.5), 0.5));
        assert!(approx_eq(ease.evaluate(0.75), 0.75));
    }

    #[test]
    fn test_ease_shape() {
        let ease = CubicBezier::new(PresetCurve::Ease.curve());
        let mid = ease.evaluate(0.5);
        assert!(mid > 0.7 && mid < 0.9, "ease midpoint should be ~0.8, got {mid}");
        assert!(ease.evaluate(0.25) < mid);
        assert!(mid < ease.evaluate(0.75));
    }

    #[test]
    fn test_ease_in_and_out() {
        let ease_in = CubicBezier::new(PresetCurve::EaseIn.curve());
        assert!(ease_in.evaluate(0.25) < 0.25);
        assert!(ease_in.evaluate(0.5) < 0.5);

        let ease_out = CubicBezier::new(PresetCurve::EaseOut.curve());
        assert!(ease_out.evaluate(0.25) > 0.25);
        assert!(ease_out.evaluate(0.5) > 0.5);
    }

    #[test]
    fn test_ease_in_out_symmetry() {
        let ease = CubicBezier::new(PresetCurve::EaseInOut.curve());
        assert!(approx_eq(ease.evaluate(0.5), 0.5));
        assert!(approx_eq(ease.evaluate(0.25) + ease.evaluate(0.75), 1.0));
    }

    #[test]
    fn test_monotonic_presets() {
        for preset in PresetCurve::all() {
            let ease = CubicBezier::new(preset.curve());
            let mut last = 0.0;
            for step in 0..=100 {
                let value = ease.evaluate(step as f64 / 100.0);
                assert!(value + 1e-9 >= last, "{} not monotonic at {step}", preset.name());
                last = value;
            }
        }
    }

    #[test]
    fn test_flat_start_converges() {
        // Zero slope at t=0 forces the bisection path
        let ease = CubicBezier::new(BezierCurve::new(1.0, 0.0, 1.0, 1.0));
        let x = 0.01;
        let value = ease.evaluate(x);
        assert!((0.0..=1.0).contains(&value));
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.0, 100.0, 0.5), 50.0);
        assert_eq!(lerp(100.0, 0.0, 0.25), 75.0);
        assert_eq!(lerp(-10.0, 10.0, 1.0), 10.0);
    }
}
