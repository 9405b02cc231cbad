//! Keyframe interpolation
//!
//! Interpolates through an ordered list of values over a fixed duration.
//! Each value sits at an offset in `[0, 1]` of the duration (evenly spread
//! unless given) and each segment between two values has its own easing.

use crate::easing::Easing;
use crate::generator::{AnimationState, KeyframeGenerator};
use cadence_core::{MotionError, Numeric, Result};

/// Default keyframe duration (ms)
pub const DEFAULT_KEYFRAMES_DURATION_MS: f64 = 300.0;

/// Timing options for [`Keyframes`]
#[derive(Clone, Debug, PartialEq)]
pub struct KeyframesOptions {
    /// Total duration (ms)
    pub duration: f64,
    /// Position of each value in `[0, 1]`; evenly spread when `None`
    pub offsets: Option<Vec<f64>>,
    /// One easing for every segment, or one per segment (wrapping)
    pub ease: Vec<Easing>,
}

impl KeyframesOptions {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            offsets: None,
            ease: Vec::new(),
        }
    }

    /// Place values at explicit offsets
    pub fn offsets(mut self, offsets: Vec<f64>) -> Self {
        self.offsets = Some(offsets);
        self
    }

    /// Use one easing for every segment
    pub fn ease(mut self, easing: Easing) -> Self {
        self.ease = vec![easing];
        self
    }

    /// Use one easing per segment
    pub fn ease_segments(mut self, easings: Vec<Easing>) -> Self {
        self.ease = easings;
        self
    }
}

impl Default for KeyframesOptions {
    fn default() -> Self {
        Self::new(DEFAULT_KEYFRAMES_DURATION_MS)
    }
}

/// Keyframe generator over any [`Numeric`] type
#[derive(Clone, Debug)]
pub struct Keyframes<T> {
    values: Vec<T>,
    offsets: Vec<f64>,
    ease: Vec<Easing>,
    duration: f64,
}

impl<T: Numeric> Keyframes<T> {
    /// Validate and build a keyframe generator
    pub fn new(values: Vec<T>, options: KeyframesOptions) -> Result<Self> {
        if values.is_empty() {
            return Err(MotionError::InvalidConfiguration(
                "keyframes need at least one value".into(),
            ));
        }
        if !options.duration.is_finite() || options.duration < 0.0 {
            return Err(MotionError::InvalidConfiguration(format!(
                "invalid keyframes duration {}",
                options.duration
            )));
        }

        let offsets = match options.offsets {
            Some(offsets) => {
                validate_offsets(&offsets, values.len())?;
                offsets
            }
            None => default_offsets(values.len()),
        };

        Ok(Self {
            values,
            offsets,
            ease: options.ease,
            duration: options.duration,
        })
    }

    /// Keyframes between two values
    pub fn tween(from: T, to: T, options: KeyframesOptions) -> Result<Self> {
        Self::new(vec![from, to], options)
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    fn easing_for(&self, segment: usize) -> Easing {
        if self.ease.is_empty() {
            Easing::Linear
        } else {
            self.ease[segment % self.ease.len()]
        }
    }

    /// Interpolate at `progress` through the whole duration
    fn interpolate(&self, progress: f64) -> T {
        let last = self.values.len() - 1;
        if last == 0 {
            return self.values[0].clone();
        }

        let mut segment = 0;
        while segment + 1 < last && self.offsets[segment + 1] <= progress {
            segment += 1;
        }

        let start = self.offsets[segment];
        let end = self.offsets[segment + 1];
        if end - start <= 0.0 {
            return self.values[segment + 1].clone();
        }

        let local = ((progress - start) / (end - start)).clamp(0.0, 1.0);
        let eased = self.easing_for(segment).apply(local);
        T::mix(&self.values[segment], &self.values[segment + 1], eased)
    }
}

impl<T: Numeric> KeyframeGenerator<T> for Keyframes<T> {
    fn next(&self, t: f64) -> AnimationState<T> {
        let done = t >= self.duration;
        if done {
            // Exact final value, never an interpolation artifact
            return AnimationState::new(true, self.values[self.values.len() - 1].clone());
        }

        let t = t.max(0.0);
        AnimationState::new(false, self.interpolate(t / self.duration))
    }

    fn calculated_duration(&self) -> Option<f64> {
        Some(self.duration)
    }
}

fn default_offsets(count: usize) -> Vec<f64> {
    if count <= 1 {
        return vec![0.0; count];
    }
    let last = (count - 1) as f64;
    (0..count).map(|i| i as f64 / last).collect()
}

fn validate_offsets(offsets: &[f64], count: usize) -> Result<()> {
    if offsets.len() != count {
        return Err(MotionError::InvalidConfiguration(format!(
            "{} offsets given for {} keyframes",
            offsets.len(),
            count
        )));
    }
    if offsets.iter().any(|o| !(0.0..=1.0).contains(o)) {
        return Err(MotionError::InvalidConfiguration(
            "keyframe offsets must lie in [0, 1]".into(),
        ));
    }
    if offsets.windows(2).any(|pair| pair[1] < pair[0]) {
        return Err(MotionError::InvalidConfiguration(
            "keyframe offsets must not decrease".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(values: Vec<f64>, duration: f64) -> Keyframes<f64> {
        Keyframes::new(values, KeyframesOptions::new(duration)).unwrap()
    }

    #[test]
    fn test_boundaries() {
        let kf = linear(vec![0.0, 10.0, 20.0], 100.0);

        assert_eq!(kf.next(0.0), AnimationState::new(false, 0.0));
        assert_eq!(kf.next(50.0), AnimationState::new(false, 10.0));
        assert_eq!(kf.next(100.0), AnimationState::new(true, 20.0));
        assert_eq!(kf.next(250.0), AnimationState::new(true, 20.0));
        assert_eq!(kf.next(-10.0).value, 0.0);
    }

    #[test]
    fn test_linear_midpoints() {
        let kf = linear(vec![0.0, 10.0, 20.0], 100.0);
        assert!((kf.next(25.0).value - 5.0).abs() < 1e-9);
        assert!((kf.next(75.0).value - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_offsets() {
        let kf = Keyframes::new(
            vec![0.0_f64, 100.0, 0.0],
            KeyframesOptions::new(100.0).offsets(vec![0.0, 0.2, 1.0]),
        )
        .unwrap();

        assert!((kf.next(10.0).value - 50.0).abs() < 1e-9);
        assert!((kf.next(20.0).value - 100.0).abs() < 1e-9);
        assert!((kf.next(60.0).value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_length_segment_jumps() {
        let kf = Keyframes::new(
            vec![0.0_f64, 10.0, 50.0, 60.0],
            KeyframesOptions::new(100.0).offsets(vec![0.0, 0.5, 0.5, 1.0]),
        )
        .unwrap();

        assert!((kf.next(49.0).value - 9.8).abs() < 1e-9);
        assert!((kf.next(50.0).value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_per_segment_easing_wraps() {
        let kf = Keyframes::new(
            vec![0.0_f64, 1.0, 2.0, 3.0],
            KeyframesOptions::new(300.0).ease_segments(vec![Easing::EaseInQuad, Easing::Linear]),
        )
        .unwrap();

        // Segment 0 eased, segment 1 linear, segment 2 eased again
        assert!((kf.next(50.0).value - 0.25).abs() < 1e-9);
        assert!((kf.next(150.0).value - 1.5).abs() < 1e-9);
        assert!((kf.next(250.0).value - 2.25).abs() < 1e-9);
    }

    #[test]
    fn test_zero_duration_is_done() {
        let kf = linear(vec![1.0, 2.0], 0.0);
        assert_eq!(kf.next(0.0), AnimationState::new(true, 2.0));
    }

    #[test]
    fn test_single_value() {
        let kf = linear(vec![7.0], 100.0);
        assert_eq!(kf.next(30.0).value, 7.0);
        assert!(kf.next(100.0).done);
    }

    #[test]
    fn test_vector_values() {
        let kf = Keyframes::tween([0.0f32, 0.0], [10.0, 20.0], KeyframesOptions::new(100.0))
            .unwrap();
        let mid = kf.next(50.0).value;
        assert!((mid[0] - 5.0).abs() < 1e-5);
        assert!((mid[1] - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_invalid_configuration() {
        let empty: Result<Keyframes<f64>> = Keyframes::new(vec![], KeyframesOptions::default());
        assert!(matches!(empty, Err(MotionError::InvalidConfiguration(_))));

        let negative = Keyframes::new(vec![0.0, 1.0], KeyframesOptions::new(-1.0));
        assert!(matches!(negative, Err(MotionError::InvalidConfiguration(_))));

        let mismatched = Keyframes::new(
            vec![0.0, 1.0],
            KeyframesOptions::new(100.0).offsets(vec![0.0, 0.5, 1.0]),
        );
        assert!(matches!(mismatched, Err(MotionError::InvalidConfiguration(_))));

        let unordered = Keyframes::new(
            vec![0.0, 1.0, 2.0],
            KeyframesOptions::new(100.0).offsets(vec![0.0, 0.8, 0.4]),
        );
        assert!(matches!(unordered, Err(MotionError::InvalidConfiguration(_))));

        let out_of_range = Keyframes::new(
            vec![0.0, 1.0],
            KeyframesOptions::new(100.0).offsets(vec![0.0, 1.5]),
        );
        assert!(matches!(out_of_range, Err(MotionError::InvalidConfiguration(_))));
    }
}
