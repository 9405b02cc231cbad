//! Easing functions for keyframe segments

/// Overshoot used by the back curves
const BACK_OVERSHOOT: f64 = 1.70158;

/// Easing function type
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    CircIn,
    CircOut,
    CircInOut,
    BackIn,
    BackOut,
    BackInOut,
    /// Pull back, then shoot to the end with an exponential tail
    Anticipate,
    /// CSS-compatible cubic Bézier through (0,0), (x1,y1), (x2,y2), (1,1)
    CubicBezier(f64, f64, f64, f64),
}

impl Easing {
    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::EaseIn | Easing::EaseInCubic => t * t * t,
            Easing::EaseOut | Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOut | Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInQuart => t * t * t * t,
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::CircIn => circ_in(t),
            Easing::CircOut => 1.0 - circ_in(1.0 - t),
            Easing::CircInOut => mirrored(t, circ_in),
            Easing::BackIn => back_in(t),
            Easing::BackOut => 1.0 - back_in(1.0 - t),
            Easing::BackInOut => mirrored(t, back_in),
            Easing::Anticipate => {
                let p = t * 2.0;
                if p < 1.0 {
                    0.5 * back_in(p)
                } else {
                    0.5 * (2.0 - 2f64.powf(-10.0 * (p - 1.0)))
                }
            }
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier(t, *x1, *y1, *x2, *y2),
        }
    }
}

fn circ_in(t: f64) -> f64 {
    1.0 - (1.0 - t.clamp(0.0, 1.0).powi(2)).sqrt()
}

fn back_in(t: f64) -> f64 {
    (BACK_OVERSHOOT + 1.0) * t * t * t - BACK_OVERSHOOT * t * t
}

/// Build an in-out curve from an in curve
fn mirrored(t: f64, ease_in: fn(f64) -> f64) -> f64 {
    if t <= 0.5 {
        ease_in(2.0 * t) / 2.0
    } else {
        (2.0 - ease_in(2.0 * (1.0 - t))) / 2.0
    }
}

const BEZIER_EPSILON: f64 = 1e-7;
const NEWTON_ITERATIONS: usize = 8;
const BISECTION_ITERATIONS: usize = 20;

/// One axis of a unit cubic Bézier with fixed endpoints at 0 and 1,
/// stored in polynomial form `((a·s + b)·s + c)·s`
#[derive(Clone, Copy)]
struct BezierAxis {
    a: f64,
    b: f64,
    c: f64,
}

impl BezierAxis {
    fn new(p1: f64, p2: f64) -> Self {
        let c = 3.0 * p1;
        let b = 3.0 * (p2 - p1) - c;
        Self { a: 1.0 - c - b, b, c }
    }

    fn at(self, s: f64) -> f64 {
        ((self.a * s + self.b) * s + self.c) * s
    }

    fn slope(self, s: f64) -> f64 {
        (3.0 * self.a * s + 2.0 * self.b) * s + self.c
    }

    /// Curve parameter whose value on this axis is `x`
    fn solve(self, x: f64) -> f64 {
        let mut s = x;
        for _ in 0..NEWTON_ITERATIONS {
            let err = self.at(s) - x;
            if err.abs() < BEZIER_EPSILON {
                return s;
            }
            let slope = self.slope(s);
            if slope.abs() < BEZIER_EPSILON {
                break;
            }
            s -= err / slope;
        }

        // Newton stalled on a flat stretch; bisect instead
        let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
        s = x;
        for _ in 0..BISECTION_ITERATIONS {
            let value = self.at(s);
            if (value - x).abs() < BEZIER_EPSILON {
                break;
            }
            if value < x {
                lo = s;
            } else {
                hi = s;
            }
            s = (lo + hi) * 0.5;
        }
        s
    }
}

/// CSS `cubic-bezier(x1, y1, x2, y2)` timing function
fn cubic_bezier(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    if t <= 0.0 || t >= 1.0 {
        return t.clamp(0.0, 1.0);
    }
    if x1 == y1 && x2 == y2 {
        return t;
    }
    let s = BezierAxis::new(x1, x2).solve(t);
    BezierAxis::new(y1, y2).at(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 21] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
        Easing::EaseInQuad,
        Easing::EaseOutQuad,
        Easing::EaseInOutQuad,
        Easing::EaseInCubic,
        Easing::EaseOutCubic,
        Easing::EaseInOutCubic,
        Easing::EaseInQuart,
        Easing::EaseOutQuart,
        Easing::EaseInOutQuart,
        Easing::CircIn,
        Easing::CircOut,
        Easing::CircInOut,
        Easing::BackIn,
        Easing::BackOut,
        Easing::BackInOut,
        Easing::Anticipate,
        Easing::CubicBezier(0.25, 0.1, 0.25, 1.0),
    ];

    #[test]
    fn test_endpoints() {
        for easing in ALL {
            assert!(easing.apply(0.0).abs() < 1e-9, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-3, "{easing:?} at 1");
        }
    }

    #[test]
    fn test_in_out_symmetry() {
        for easing in [Easing::EaseInOutQuad, Easing::CircInOut, Easing::BackInOut] {
            assert!((easing.apply(0.5) - 0.5).abs() < 1e-9, "{easing:?}");
        }
    }

    #[test]
    fn test_back_overshoots() {
        assert!(Easing::BackIn.apply(0.2) < 0.0);
        assert!(Easing::BackOut.apply(0.8) > 1.0);
        assert!(Easing::Anticipate.apply(0.2) < 0.0);
    }

    #[test]
    fn test_cubic_bezier_linear() {
        let linear = Easing::CubicBezier(0.0, 0.0, 1.0, 1.0);
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            assert!((linear.apply(t) - t).abs() < 1e-6);
        }
    }

    #[test]
    fn test_symmetric_bezier_is_point_symmetric() {
        let ease = Easing::CubicBezier(0.42, 0.0, 0.58, 1.0);
        assert!((ease.apply(0.5) - 0.5).abs() < 1e-6);
        for i in 1..10 {
            let t = i as f64 / 10.0;
            assert!((ease.apply(t) + ease.apply(1.0 - t) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_bezier_axis_solves_its_own_samples() {
        let axis = BezierAxis::new(0.25, 0.25);
        assert_eq!(axis.at(0.0), 0.0);
        assert!((axis.at(1.0) - 1.0).abs() < 1e-12);
        for i in 1..10 {
            let s = i as f64 / 10.0;
            assert!((axis.solve(axis.at(s)) - s).abs() < 1e-5);
        }
    }

    #[test]
    fn test_cubic_bezier_ease_is_monotonic() {
        let ease = Easing::CubicBezier(0.25, 0.1, 0.25, 1.0);
        let mut last = 0.0;
        for i in 1..=100 {
            let v = ease.apply(i as f64 / 100.0);
            assert!(v >= last);
            last = v;
        }
    }
}
