//! Spring physics generator
//!
//! Closed-form damped harmonic oscillator. Unlike a stepped integrator the
//! position is an exact function of elapsed time, so the generator can be
//! sampled at arbitrary times and seeked freely.
//!
//! Three regimes are solved analytically:
//!
//! - **Underdamped** (`ζ < 1`): oscillates around the target with a decaying
//!   envelope
//! - **Critically damped** (`ζ ≈ 1`): fastest approach without overshoot
//! - **Overdamped** (`ζ > 1`): slow approach without overshoot

use crate::generator::{AnimationState, KeyframeGenerator};
use cadence_core::{velocity_per_second, MotionError, Result};

/// Damping ratios this close to 1 use the critically damped solution
const CRITICAL_EPSILON: f64 = 0.001;

/// Clamp on the hyperbolic argument of the overdamped solution
const MAX_HYPERBOLIC_ARG: f64 = 300.0;

/// Window used to differentiate position into velocity (ms)
const VELOCITY_SAMPLE_MS: f64 = 5.0;

/// Springs moving less than this are "granular" and settle more precisely
const GRANULAR_RANGE: f64 = 5.0;

const SAFE_MIN: f64 = 0.001;
const MIN_DURATION_S: f64 = 0.01;
const MAX_DURATION_S: f64 = 10.0;
const MIN_DAMPING_RATIO: f64 = 0.05;
const MAX_DAMPING_RATIO: f64 = 1.0;
const ROOT_ITERATIONS: usize = 12;

/// Default bounce of duration-based springs
pub const DEFAULT_BOUNCE: f64 = 0.3;

/// Configuration for a spring animation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringOptions {
    pub stiffness: f64,
    pub damping: f64,
    pub mass: f64,
    /// Initial velocity (units per second)
    pub velocity: f64,
    /// Speed under which the spring may come to rest (units per second)
    pub rest_speed: Option<f64>,
    /// Distance from the target under which the spring may come to rest
    pub rest_delta: Option<f64>,
    /// Settle in exactly this many ms, deriving stiffness and damping
    pub duration: Option<f64>,
    /// Bounciness of a duration-based spring (0 = no overshoot)
    pub bounce: f64,
}

impl SpringOptions {
    /// Create a new spring configuration
    pub fn new(stiffness: f64, damping: f64, mass: f64) -> Self {
        Self {
            stiffness,
            damping,
            mass,
            velocity: 0.0,
            rest_speed: None,
            rest_delta: None,
            duration: None,
            bounce: DEFAULT_BOUNCE,
        }
    }

    /// A spring that settles after `duration` ms with the given bounce
    pub fn from_duration(duration: f64, bounce: f64) -> Self {
        Self {
            duration: Some(duration),
            bounce,
            ..Self::default()
        }
    }

    /// A gentle, slow spring (good for page transitions)
    pub fn gentle() -> Self {
        Self::new(120.0, 14.0, 1.0)
    }

    /// A wobbly spring with overshoot (good for playful UI)
    pub fn wobbly() -> Self {
        Self::new(180.0, 12.0, 1.0)
    }

    /// A stiff, snappy spring (good for buttons)
    pub fn stiff() -> Self {
        Self::new(400.0, 30.0, 1.0)
    }

    /// A very stiff spring with minimal oscillation
    pub fn snappy() -> Self {
        Self::new(600.0, 40.0, 1.0)
    }

    /// A slow spring with no overshoot (critically damped)
    pub fn molasses() -> Self {
        Self::new(100.0, 20.0, 1.0)
    }

    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn rest_speed(mut self, rest_speed: f64) -> Self {
        self.rest_speed = Some(rest_speed);
        self
    }

    pub fn rest_delta(mut self, rest_delta: f64) -> Self {
        self.rest_delta = Some(rest_delta);
        self
    }

    /// Calculate critical damping for this spring's stiffness and mass
    pub fn critical_damping(&self) -> f64 {
        2.0 * (self.stiffness * self.mass).sqrt()
    }

    /// Damping ratio ζ
    pub fn damping_ratio(&self) -> f64 {
        self.damping / self.critical_damping()
    }

    /// Check if the spring is underdamped (will oscillate)
    pub fn is_underdamped(&self) -> bool {
        self.damping_ratio() < 1.0 - CRITICAL_EPSILON
    }

    /// Check if the spring is critically damped
    pub fn is_critically_damped(&self) -> bool {
        (self.damping_ratio() - 1.0).abs() < CRITICAL_EPSILON
    }

    /// Check if the spring is overdamped (slow settling, no oscillation)
    pub fn is_overdamped(&self) -> bool {
        self.damping_ratio() > 1.0 + CRITICAL_EPSILON
    }

    fn validate(&self) -> Result<()> {
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(MotionError::InvalidConfiguration(format!(
                "spring mass must be positive, got {}",
                self.mass
            )));
        }
        if !(self.stiffness.is_finite() && self.stiffness > 0.0) {
            return Err(MotionError::InvalidConfiguration(format!(
                "spring stiffness must be positive, got {}",
                self.stiffness
            )));
        }
        if !(self.damping.is_finite() && self.damping >= 0.0) {
            return Err(MotionError::InvalidConfiguration(format!(
                "spring damping must not be negative, got {}",
                self.damping
            )));
        }
        if !self.velocity.is_finite() {
            return Err(MotionError::InvalidConfiguration(
                "spring velocity must be finite".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SpringOptions {
    fn default() -> Self {
        Self::new(100.0, 10.0, 1.0)
    }
}

/// Physical parameters derived from a duration and bounce
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedSpring {
    pub stiffness: f64,
    pub damping: f64,
    /// Clamped duration (ms)
    pub duration: f64,
}

/// Find stiffness and damping that settle a spring in `duration` ms
///
/// The damping ratio is `1 - bounce`, clamped to `[0.05, 1]`, and the
/// duration is clamped to `[10ms, 10s]`. The undamped frequency is found by
/// Newton iteration on the envelope of the oscillation; if that diverges the
/// default 100/10 spring is returned.
pub fn find_spring(duration: f64, bounce: f64, mass: f64) -> ResolvedSpring {
    let damping_ratio = (1.0 - bounce).clamp(MIN_DAMPING_RATIO, MAX_DAMPING_RATIO);
    let duration_s = (duration / 1000.0).clamp(MIN_DURATION_S, MAX_DURATION_S);

    let undamped_freq = if damping_ratio < 1.0 {
        let envelope = |freq: f64| {
            let decay = freq * damping_ratio;
            let a = decay;
            let b = angular_freq(freq, damping_ratio);
            SAFE_MIN - (a / b) * (-decay * duration_s).exp()
        };
        let derivative = |freq: f64| {
            let decay = freq * damping_ratio;
            let e = damping_ratio.powi(2) * freq.powi(2) * duration_s;
            let f = (-decay * duration_s).exp();
            let g = angular_freq(freq.powi(2), damping_ratio);
            let factor = if -envelope(freq) + SAFE_MIN > 0.0 { -1.0 } else { 1.0 };
            factor * (-e * f) / g
        };
        approximate_root(envelope, derivative, 5.0 / duration_s)
    } else {
        let envelope = |freq: f64| -SAFE_MIN + (-freq * duration_s).exp() * (freq * duration_s + 1.0);
        let derivative = |freq: f64| (-freq * duration_s).exp() * (-freq * duration_s * duration_s);
        approximate_root(envelope, derivative, 5.0 / duration_s)
    };

    let duration = duration_s * 1000.0;
    if !undamped_freq.is_finite() {
        tracing::debug!(duration, bounce, "find_spring: no root, using default spring");
        let fallback = SpringOptions::default();
        return ResolvedSpring {
            stiffness: fallback.stiffness,
            damping: fallback.damping,
            duration,
        };
    }

    let stiffness = undamped_freq.powi(2) * mass;
    ResolvedSpring {
        stiffness,
        damping: damping_ratio * 2.0 * (mass * stiffness).sqrt(),
        duration,
    }
}

fn angular_freq(undamped_freq: f64, damping_ratio: f64) -> f64 {
    undamped_freq * (1.0 - damping_ratio * damping_ratio).sqrt()
}

fn approximate_root<E, D>(envelope: E, derivative: D, initial_guess: f64) -> f64
where
    E: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    let mut result = initial_guess;
    for _ in 1..ROOT_ITERATIONS {
        result -= envelope(result) / derivative(result);
    }
    result
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Regime {
    Underdamped { angular_freq: f64 },
    Critical,
    Overdamped { damped_freq: f64 },
}

/// Spring generator from `origin` to `target`
#[derive(Clone, Debug)]
pub struct SpringGenerator {
    origin: f64,
    target: f64,
    /// Initial velocity (units per second)
    velocity: f64,
    damping_ratio: f64,
    /// Undamped angular frequency (per ms)
    undamped_freq: f64,
    regime: Regime,
    rest_speed: f64,
    rest_delta: f64,
    /// Set when stiffness and damping were derived from a duration
    fixed_duration: Option<f64>,
    options: SpringOptions,
}

impl SpringGenerator {
    /// Validate `options` and build a generator
    pub fn new(origin: f64, target: f64, options: SpringOptions) -> Result<Self> {
        if !origin.is_finite() || !target.is_finite() {
            return Err(MotionError::InvalidConfiguration(
                "spring endpoints must be finite".into(),
            ));
        }

        let mut options = options;
        let mut fixed_duration = None;
        if let Some(duration) = options.duration {
            if !duration.is_finite() || duration < 0.0 {
                return Err(MotionError::InvalidConfiguration(format!(
                    "invalid spring duration {duration}"
                )));
            }
            let resolved = find_spring(duration, options.bounce, 1.0);
            options.stiffness = resolved.stiffness;
            options.damping = resolved.damping;
            options.mass = 1.0;
            fixed_duration = Some(resolved.duration);
        }
        options.validate()?;

        let damping_ratio = options.damping_ratio();
        let undamped_freq = (options.stiffness / options.mass).sqrt() / 1000.0;
        let regime = if (damping_ratio - 1.0).abs() < CRITICAL_EPSILON {
            Regime::Critical
        } else if damping_ratio < 1.0 {
            Regime::Underdamped {
                angular_freq: angular_freq(undamped_freq, damping_ratio),
            }
        } else {
            Regime::Overdamped {
                damped_freq: undamped_freq * (damping_ratio * damping_ratio - 1.0).sqrt(),
            }
        };

        let granular = (target - origin).abs() < GRANULAR_RANGE;
        let rest_speed = options
            .rest_speed
            .unwrap_or(if granular { 0.01 } else { 2.0 });
        let rest_delta = options
            .rest_delta
            .unwrap_or(if granular { 0.005 } else { 0.5 });

        Ok(Self {
            origin,
            target,
            velocity: options.velocity,
            damping_ratio,
            undamped_freq,
            regime,
            rest_speed,
            rest_delta,
            fixed_duration,
            options,
        })
    }

    pub fn origin(&self) -> f64 {
        self.origin
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Effective options, with derived stiffness and damping filled in
    pub fn options(&self) -> &SpringOptions {
        &self.options
    }

    pub fn damping_ratio(&self) -> f64 {
        self.damping_ratio
    }

    /// Position `t` ms after the start, ignoring rest detection
    pub fn position(&self, t: f64) -> f64 {
        let t = t.max(0.0);
        let delta = self.target - self.origin;
        // Per-millisecond, pointing towards the origin
        let v0 = -self.velocity / 1000.0;
        let w0 = self.undamped_freq;
        let zeta = self.damping_ratio;

        match self.regime {
            Regime::Underdamped { angular_freq } => {
                let envelope = (-zeta * w0 * t).exp();
                self.target
                    - envelope
                        * (((v0 + zeta * w0 * delta) / angular_freq) * (angular_freq * t).sin()
                            + delta * (angular_freq * t).cos())
            }
            Regime::Critical => self.target - (-w0 * t).exp() * (delta + (v0 + w0 * delta) * t),
            Regime::Overdamped { damped_freq } => {
                let envelope = (-zeta * w0 * t).exp();
                let arg = (damped_freq * t).min(MAX_HYPERBOLIC_ARG);
                self.target
                    - envelope
                        * ((v0 + zeta * w0 * delta) * arg.sinh()
                            + damped_freq * delta * arg.cosh())
                        / damped_freq
            }
        }
    }

    /// Velocity `t` ms after the start (units per second)
    pub fn velocity_at(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return self.velocity;
        }
        let prev_t = (t - VELOCITY_SAMPLE_MS).max(0.0);
        velocity_per_second(self.position(t) - self.position(prev_t), t - prev_t)
    }
}

impl KeyframeGenerator<f64> for SpringGenerator {
    fn next(&self, t: f64) -> AnimationState<f64> {
        if let Some(duration) = self.fixed_duration {
            if t >= duration {
                return AnimationState::new(true, self.target);
            }
            return AnimationState::new(false, self.position(t));
        }

        let current = self.position(t);
        let is_below_speed = self.velocity_at(t).abs() <= self.rest_speed;
        let is_below_delta = (self.target - current).abs() <= self.rest_delta;

        if is_below_speed && is_below_delta {
            AnimationState::new(true, self.target)
        } else {
            AnimationState::new(false, current)
        }
    }

    fn calculated_duration(&self) -> Option<f64> {
        self.fixed_duration
    }
}
