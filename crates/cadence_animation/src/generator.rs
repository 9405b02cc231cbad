//! Keyframe generators
//!
//! A generator is a pure function of elapsed time: it holds no clock and no
//! target, so the same generator can be sampled at any time, in any order.

/// Step used when searching for the end of a generator without a known
/// duration (ms)
pub const GENERATOR_DURATION_STEP_MS: f64 = 50.0;

/// Generators still running after this long are treated as endless (ms)
pub const MAX_GENERATOR_DURATION_MS: f64 = 20_000.0;

/// Sample of a generator at one point in time
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationState<T> {
    /// Whether the generator has reached its final value
    pub done: bool,
    pub value: T,
}

impl<T> AnimationState<T> {
    pub fn new(done: bool, value: T) -> Self {
        Self { done, value }
    }
}

/// Maps elapsed milliseconds to a value
pub trait KeyframeGenerator<T> {
    /// Sample the generator `t` ms after its start
    fn next(&self, t: f64) -> AnimationState<T>;

    /// Duration when known up front (ms)
    fn calculated_duration(&self) -> Option<f64> {
        None
    }

    /// Duration, searching for it when it is not known up front (ms)
    ///
    /// Capped at [`MAX_GENERATOR_DURATION_MS`].
    fn resolved_duration(&self) -> f64 {
        self.calculated_duration()
            .unwrap_or_else(|| calc_generator_duration(|t| self.next(t).done))
    }
}

impl<T, G: KeyframeGenerator<T> + ?Sized> KeyframeGenerator<T> for Box<G> {
    fn next(&self, t: f64) -> AnimationState<T> {
        (**self).next(t)
    }

    fn calculated_duration(&self) -> Option<f64> {
        (**self).calculated_duration()
    }

    fn resolved_duration(&self) -> f64 {
        (**self).resolved_duration()
    }
}

/// Step through time until `is_done` reports true
///
/// Returns the first sampled time at which the generator is done, or
/// [`MAX_GENERATOR_DURATION_MS`] if it never finishes.
pub fn calc_generator_duration<F>(is_done: F) -> f64
where
    F: Fn(f64) -> bool,
{
    let mut t = 0.0;
    while t < MAX_GENERATOR_DURATION_MS {
        if is_done(t) {
            return t;
        }
        t += GENERATOR_DURATION_STEP_MS;
    }
    MAX_GENERATOR_DURATION_MS
}
